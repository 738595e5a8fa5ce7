use crate::error::TrenchError;
use crate::model::Authority;
use crate::profile::schema::AuthorityProfile;
use crate::profile::validate_profile;

const MCGM_JSON: &str = include_str!("../../../../profiles/mcgm.json");
const MBMC_JSON: &str = include_str!("../../../../profiles/mbmc.json");

/// Authorities that ship a builtin profile.
pub const PRESETS: &[Authority] = &[Authority::Mcgm, Authority::Mbmc];

/// Load the builtin profile for an authority.
pub fn load_builtin(authority: Authority) -> Result<AuthorityProfile, TrenchError> {
    let json = match authority {
        Authority::Mcgm => MCGM_JSON,
        Authority::Mbmc => MBMC_JSON,
        other => return Err(TrenchError::UnsupportedAuthority(other)),
    };
    let profile: AuthorityProfile = serde_json::from_str(json)?;
    validate_profile(&profile)?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldKey;
    use crate::profile::schema::HeaderRole;

    #[test]
    fn test_builtin_profiles_validate() {
        for &authority in PRESETS {
            let profile = load_builtin(authority).unwrap();
            assert_eq!(profile.authority, authority);
        }
    }

    #[test]
    fn test_mcgm_schema_shapes() {
        let profile = load_builtin(Authority::Mcgm).unwrap();
        assert_eq!(profile.non_refundable.headers.len(), 59);
        assert_eq!(profile.sd.headers.len(), 20);
        assert_eq!(profile.tables.vector_pages, vec![1]);
        assert_eq!(profile.tables.raster_page, None);
        assert_eq!(profile.non_refundable.dynamic_header_names().len(), 14);
    }

    #[test]
    fn test_mbmc_uses_raster_page_two() {
        let profile = load_builtin(Authority::Mbmc).unwrap();
        assert_eq!(profile.tables.raster_page, Some(2));
        assert_eq!(profile.sd.headers.len(), 24);
        let total_route = profile
            .non_refundable
            .header_for_field(FieldKey::TotalRoute)
            .unwrap();
        assert!(total_route.editable);
        assert!(matches!(total_route.role, HeaderRole::Derived { .. }));
    }

    #[test]
    fn test_stub_authority_has_no_profile() {
        assert!(matches!(
            load_builtin(Authority::Kdmc),
            Err(TrenchError::UnsupportedAuthority(Authority::Kdmc))
        ));
    }
}
