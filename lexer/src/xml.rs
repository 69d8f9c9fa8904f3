use token::{Located, Token};

/// Renders a token sequence in the analyzer's `<tokens>` XML form, one
/// element per line. `Eof` is not rendered.
pub fn tokens_to_xml(tokens: &[Located]) -> String {
    let mut out = String::from("<tokens>\n");

    for located in tokens {
        if located.token == Token::Eof {
            continue;
        }

        out.push_str(&located.token.to_xml());
        out.push('\n');
    }

    out.push_str("</tokens>\n");
    out
}
