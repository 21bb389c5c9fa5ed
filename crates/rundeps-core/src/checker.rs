//! Post-install version validation.

use crate::error::{Error, Result};
use crate::host::VersionQuery;
use crate::requirement::PackageRequirement;
use tracing::{debug, error};

/// Verify the installed version of `requirement` against its constraint.
///
/// Requirements without a constraint are not checked.
///
/// # Errors
/// `PackageNotFound` if nothing is installed under the name,
/// `VersionCompatibility` if the installed version does not satisfy the
/// constraint (including an unparsable installed version).
pub fn check_version<Q: VersionQuery + ?Sized>(
    requirement: &PackageRequirement,
    versions: &Q,
) -> Result<()> {
    let constraint = requirement.version_spec();
    if constraint.is_any() {
        return Ok(());
    }

    let Some(installed) = versions.installed_version(requirement.name())? else {
        error!(package = %requirement.name(), "Package not found after installation");
        return Err(Error::PackageNotFound {
            name: requirement.name().to_string(),
        });
    };

    if !constraint.satisfies(&installed) {
        error!(
            package = %requirement.name(),
            installed = %installed,
            constraint = %constraint,
            "Installed version does not satisfy the declared constraint"
        );
        return Err(Error::VersionCompatibility {
            name: requirement.name().to_string(),
            installed,
            constraint: constraint.to_string(),
        });
    }

    debug!(package = %requirement.name(), installed = %installed, "version ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;

    fn versions(name: &str, version: &str) -> StaticRegistry<()> {
        let mut registry = StaticRegistry::new();
        registry.add_version(name, version);
        registry
    }

    #[test]
    fn test_satisfied() {
        let req = PackageRequirement::new("IPy", ">=1.1", false).unwrap();
        assert!(check_version(&req, &versions("IPy", "1.1")).is_ok());
    }

    #[test]
    fn test_incompatible() {
        let req = PackageRequirement::new("pymongo", ">=3.11.4, <4.0.0", false).unwrap();
        let err = check_version(&req, &versions("pymongo", "1.0.0")).unwrap_err();
        match err {
            Error::VersionCompatibility {
                name,
                installed,
                constraint,
            } => {
                assert_eq!(name, "pymongo");
                assert_eq!(installed, "1.0.0");
                assert_eq!(constraint, ">=3.11.4,<4.0.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparsable_installed_version_is_incompatible() {
        let req = PackageRequirement::new("odd", ">=1.0", false).unwrap();
        let err = check_version(&req, &versions("odd", "master-build")).unwrap_err();
        assert!(matches!(err, Error::VersionCompatibility { .. }));
    }

    #[test]
    fn test_not_installed() {
        let req = PackageRequirement::new("IPy", ">=1.1", false).unwrap();
        let err = check_version(&req, &StaticRegistry::<()>::new()).unwrap_err();
        assert!(matches!(err, Error::PackageNotFound { ref name } if name == "IPy"));
    }

    #[test]
    fn test_empty_constraint_skips_lookup() {
        let req = PackageRequirement::new("IPy", "", false).unwrap();
        assert!(check_version(&req, &StaticRegistry::<()>::new()).is_ok());
    }
}
