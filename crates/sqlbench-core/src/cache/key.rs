use sha2::{Digest, Sha256};

/// Identity of one unit of benchmark work: the same case name, target and
/// resolved statement always map to the same key. Each part is length
/// prefixed, so no two distinct triples share an encoding.
pub fn run_key(name: &str, connection_target: &str, statement: &str) -> String {
    let mut h = Sha256::new();
    for part in [name, connection_target, statement] {
        h.update((part.len() as u64).to_be_bytes());
        h.update(part.as_bytes());
    }
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_depends_on_every_part() {
        let base = run_key("a", "t", "select 1");
        assert_eq!(base.len(), 64);
        assert_eq!(base, run_key("a", "t", "select 1"));
        assert_ne!(base, run_key("b", "t", "select 1"));
        assert_ne!(base, run_key("a", "u", "select 1"));
        assert_ne!(base, run_key("a", "t", "select 2"));
    }

    #[test]
    fn test_separators_inside_parts_do_not_collide() {
        assert_ne!(run_key("a\nb", "t", "s"), run_key("a", "b\nt", "s"));
        assert_ne!(run_key("a", "", "bs"), run_key("a", "b", "s"));
    }
}
