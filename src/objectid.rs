use uuid::Uuid;

/// Prefix the wire format uses for tool use block ids
pub const TOOL_USE_PREFIX: &str = "toolu";

/// Random id in the wire's `<prefix>_<hex>` style
pub fn create_object_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

pub fn tool_use_id() -> String {
    create_object_id(TOOL_USE_PREFIX)
}

/// The prefix of a `<prefix>_<rest>` id, if it has one
pub fn id_prefix(id: &str) -> Option<&str> {
    id.split_once('_')
        .map(|(prefix, _)| prefix)
        .filter(|prefix| !prefix.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_use_id_shape() {
        let id = tool_use_id();
        assert_eq!(id_prefix(&id), Some(TOOL_USE_PREFIX));
        let suffix = &id[TOOL_USE_PREFIX.len() + 1..];
        assert_eq!(suffix.len(), 32);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(tool_use_id(), id);
    }

    #[test]
    fn test_id_prefix() {
        assert_eq!(id_prefix("msg_013Zva2CMHLNnXjNJJKqJ2EF"), Some("msg"));
        assert_eq!(id_prefix("toolu_01A09q90qw90lq917835lq9"), Some("toolu"));
        assert_eq!(id_prefix("no-prefix"), None);
        assert_eq!(id_prefix("_leading"), None);
    }
}
