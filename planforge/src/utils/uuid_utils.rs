//! UUID generation.

use uuid::Uuid;

/// Generates a job id.
///
/// Job ids are time-ordered (UUID v7) so registry dumps and logs sort by
/// creation time.
#[must_use]
pub fn generate_job_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        let a = generate_job_id();
        let b = generate_job_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_job_id_is_v7() {
        let id = Uuid::parse_str(&generate_job_id()).unwrap();
        assert_eq!(id.get_version_num(), 7);
    }
}
