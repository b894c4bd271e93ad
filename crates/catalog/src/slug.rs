/// URL-safe slug: lowercase ASCII alphanumerics separated by single dashes.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn collapses_separators_and_trims() {
        assert_eq!(slugify("  Hand-Block Printed   Kurta! "), "hand-block-printed-kurta");
        assert_eq!(slugify("Café Mugs (Set of 2)"), "caf-mugs-set-of-2");
        assert_eq!(slugify("---"), "");
    }
}
