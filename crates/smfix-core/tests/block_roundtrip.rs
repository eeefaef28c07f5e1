use proptest::prelude::*;
use smfix_core::{Block, Sequence};

fn token_strategy() -> impl Strategy<Value = String> {
    ("[A-Z]", "-?[0-9]{1,4}(\\.[0-9]{1,5})?").prop_map(|(word, address)| word + &address)
}

proptest! {
    #[test]
    fn prop_format_reproduces_command_line(
        tokens in prop::collection::vec(token_strategy(), 1..8),
        spacing in prop::collection::vec("[ \t]{1,3}", 8),
    ) {
        let mut line = String::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                line.push_str(&spacing[i % spacing.len()]);
            }
            line.push_str(token);
        }

        let block = Block::parse(&line).unwrap();
        let formatted = block.format("%c %p");
        prop_assert_eq!(formatted.trim_end(), tokens.join(" "));
        prop_assert_eq!(block.to_string(), tokens.join(" "));
    }
}

#[test]
fn test_sequence_text_roundtrip() {
    let text = "G28\nT0\nM104 S200 T0 ; heat\nG1 X10 Y10 E0.5\n;LAYER_CHANGE\n";
    let sequence = Sequence::parse(text).unwrap();
    assert_eq!(sequence.to_text(), text);
}

#[test]
fn test_comment_spacing_is_normalized() {
    let sequence = Sequence::parse("G1 X1    ;   note   \n").unwrap();
    assert_eq!(sequence.to_text(), "G1 X1 ;   note\n");
}
