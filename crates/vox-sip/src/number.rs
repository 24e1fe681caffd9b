//! Caller-number extraction and E.164 normalization (spec §4.A
//! `HandleInvite`, §8 property 7: idempotent, preserves E.164-shaped and
//! extension-length inputs unchanged).

/// Extract and normalize a caller number from a `From`/`To` header value or
/// a bare `sip:`/`tel:` URI. Numbers of 4 digits or fewer are treated as
/// internal extensions and left without a `+` prefix; everything else is
/// assumed to be a full PSTN number and gets a leading `+` if it lacks one.
pub fn normalize_caller_number(input: &str) -> String {
    let user = extract_user_part(input);
    let mut digits = String::new();

    for c in user.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        }
        // '+' and any other delimiter (-, ., (, ), space) are dropped here;
        // the '+' is re-added below for non-extension numbers.
    }

    if digits.is_empty() {
        return user.to_string();
    }

    if digits.len() <= 4 {
        // extension: no country-code prefix, preserved as-is
        digits
    } else {
        format!("+{digits}")
    }
}

/// Pull the "user" portion out of a SIP header value that may wrap a
/// `sip:`/`tel:` URI in angle brackets and carry a display name or tags,
/// e.g. `"Jane" <sip:+15551234567@pbx.example.com>;tag=abc`. If no URI
/// scheme is present the input is assumed to already be a bare user part
/// (this is what makes normalization idempotent).
fn extract_user_part(input: &str) -> &str {
    let scheme_start = input.find("sip:").or_else(|| input.find("tel:"));
    let Some(scheme_start) = scheme_start else {
        return input.trim();
    };
    let after_scheme = &input[scheme_start..];
    let after_scheme = after_scheme
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(after_scheme);

    let end = after_scheme
        .find(|c| c == '@' || c == '>' || c == ';')
        .unwrap_or(after_scheme.len());
    after_scheme[..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_angle_bracket_sip_uri() {
        assert_eq!(
            normalize_caller_number("<sip:+15551234567@pbx>"),
            "+15551234567"
        );
    }

    #[test]
    fn extracts_from_tel_uri_with_delimiters() {
        assert_eq!(normalize_caller_number("tel:+1-555-123-4567"), "+15551234567");
    }

    #[test]
    fn short_extension_has_no_plus_prefix() {
        assert_eq!(normalize_caller_number("sip:1001@local"), "1001");
    }

    #[test]
    fn untagged_long_number_gets_plus_prefix() {
        assert_eq!(normalize_caller_number("sip:15551234567@pbx"), "+15551234567");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in [
            "<sip:+15551234567@pbx>",
            "sip:1001@local",
            "tel:+1-555-123-4567",
        ] {
            let once = normalize_caller_number(input);
            let twice = normalize_caller_number(&once);
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn e164_shaped_input_preserved_unchanged() {
        let e164 = normalize_caller_number("+15551234567");
        assert_eq!(e164, "+15551234567");
    }

    #[test]
    fn extension_length_input_preserved_unchanged() {
        assert_eq!(normalize_caller_number("1001"), "1001");
    }

    proptest::proptest! {
        /// Normalization is idempotent for any digit string wrapped in a
        /// sip: URI, not just the handful of fixed examples above (spec
        /// §8 property 7).
        #[test]
        fn idempotent_over_arbitrary_digit_strings(digits in "[0-9]{1,15}") {
            let input = format!("sip:{digits}@pbx.example.com");
            let once = normalize_caller_number(&input);
            let twice = normalize_caller_number(&once);
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
