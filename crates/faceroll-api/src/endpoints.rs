//! Request paths, relative to the configured service endpoint.

const ROOT: &str = "face/v1.0";

/// Attributes the quality filter needs from detection.
pub const FACE_ATTRIBUTES: &str = "headPose,occlusion,glasses,accessories,blur,exposure,noise";

pub fn detect() -> String {
    format!("{ROOT}/detect")
}

pub fn verify() -> String {
    format!("{ROOT}/verify")
}

pub fn person_group(group_id: &str) -> String {
    format!("{ROOT}/largepersongroups/{group_id}")
}

pub fn persons(group_id: &str) -> String {
    format!("{}/persons", person_group(group_id))
}

pub fn person(group_id: &str, person_id: &str) -> String {
    format!("{}/{person_id}", persons(group_id))
}

pub fn persisted_faces(group_id: &str, person_id: &str) -> String {
    format!("{}/persistedfaces", person(group_id, person_id))
}

pub fn train(group_id: &str) -> String {
    format!("{}/train", person_group(group_id))
}

pub fn training_status(group_id: &str) -> String {
    format!("{}/training", person_group(group_id))
}

/// Join `path` onto `endpoint`, tolerating a trailing slash on the endpoint.
pub fn url(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_paths() {
        assert_eq!(person_group("staff"), "face/v1.0/largepersongroups/staff");
        assert_eq!(persons("staff"), "face/v1.0/largepersongroups/staff/persons");
        assert_eq!(train("staff"), "face/v1.0/largepersongroups/staff/train");
        assert_eq!(training_status("staff"), "face/v1.0/largepersongroups/staff/training");
    }

    #[test]
    fn test_person_paths() {
        assert_eq!(
            person("staff", "p-1"),
            "face/v1.0/largepersongroups/staff/persons/p-1"
        );
        assert_eq!(
            persisted_faces("staff", "p-1"),
            "face/v1.0/largepersongroups/staff/persons/p-1/persistedfaces"
        );
    }

    #[test]
    fn test_url_join() {
        assert_eq!(
            url("https://x.azure.com/", &detect()),
            "https://x.azure.com/face/v1.0/detect"
        );
        assert_eq!(
            url("https://x.azure.com", &verify()),
            "https://x.azure.com/face/v1.0/verify"
        );
    }
}
