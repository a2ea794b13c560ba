/// Normalize a producer credit for the `producers` natural key.
///
/// Upstream sources disagree on casing, spacing, and credit annotations
/// ("Metro Boomin (Add. Producer)"); this collapses those variants onto one
/// row.
pub fn normalize_producer_name(name: &str) -> String {
    let mut trimmed = name.trim();

    // Drop a trailing parenthetical credit annotation (balanced, so nested
    // parentheses inside the annotation are consumed with it).
    if trimmed.ends_with(')') {
        let mut depth = 0usize;
        for (idx, c) in trimmed.char_indices().rev() {
            match c {
                ')' => depth += 1,
                '(' => {
                    depth -= 1;
                    if depth == 0 {
                        trimmed = trimmed[..idx].trim_end();
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_whitespace() {
        assert_eq!(normalize_producer_name("  Rick   Rubin "), "rick rubin");
    }

    #[test]
    fn strips_trailing_credit_annotation() {
        assert_eq!(
            normalize_producer_name("Metro Boomin (Add. Producer)"),
            "metro boomin"
        );
    }

    #[test]
    fn strips_nested_trailing_annotation() {
        assert_eq!(
            normalize_producer_name("El-P (of Run (The) Jewels)"),
            "el-p"
        );
    }

    #[test]
    fn leaves_unannotated_names_alone() {
        assert_eq!(normalize_producer_name("9th Wonder"), "9th wonder");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_producer_name("   "), "");
    }
}
