use std::cmp::Ordering;

use corpus_index::{
    codec::{Codec, CodecConfig, SegmentFiles, SegmentReader, SegmentWriteState},
    collation::{CollatorConfig, Collators, Sensitivity},
    grouping::{ContextTerms, GroupingContext, PropertyValue},
    postings::MemoryFields,
};
use rstest::rstest;
use temp_dir::TempDir;

fn open_segment(dir: &TempDir) -> SegmentReader {
    let mut fields = MemoryFields::new();
    fields.add_document(0, "word", &["The", "quick", "brown", "fox", "a:b"]);
    fields.add_document(1, "word", &["the", "lazy", "dog"]);

    let files = SegmentFiles::new(dir.path(), "_0");
    let mut state = SegmentWriteState::new(files.clone(), fields.max_doc(), fields.field_infos());
    let codec = Codec::new(CodecConfig::default());
    codec.write_segment(&mut state, &fields).unwrap();
    codec.open_segment(&files).unwrap()
}

fn words(segment: &SegmentReader, sensitivity: Sensitivity, terms: &[&str]) -> ContextTerms {
    let index = segment.forward_index().unwrap();
    ContextTerms {
        field: "word".to_string(),
        sensitivity,
        term_ids: terms
            .iter()
            .map(|t| index.resolve_term_id("word", t).unwrap().unwrap())
            .collect(),
    }
}

#[test]
fn test_serialization() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let segment = open_segment(&dir);
    let collators = Collators::new(CollatorConfig::default()).unwrap();
    let context = GroupingContext::new(segment.forward_index().unwrap(), &collators);

    let value =
        PropertyValue::ContextWords(words(&segment, Sensitivity::Insensitive, &["the", "lazy"]));
    let serialized = context.serialize(&value).unwrap();
    assert_eq!(serialized, "cws:word:i:the:lazy");
    assert_eq!(context.deserialize(&serialized), Some(value));

    let value = PropertyValue::ContextWord(words(&segment, Sensitivity::Sensitive, &["a:b"]));
    let serialized = context.serialize(&value).unwrap();
    assert_eq!(serialized, "cwo:word:s:a$CLb");
    assert_eq!(context.deserialize(&serialized), Some(value));

    let value = PropertyValue::Multiple(vec![
        PropertyValue::Decade(1990),
        PropertyValue::Int(-3),
        PropertyValue::Str("x,y$z".to_string()),
    ]);
    let serialized = context.serialize(&value).unwrap();
    assert_eq!(serialized, "mul,dec:1990,int:-3,str:x$CMy$DLz");
    assert_eq!(context.deserialize(&serialized), Some(value));

    // Years are brought back to their decade
    assert_eq!(context.deserialize("dec:1987"), Some(PropertyValue::Decade(1980)));
}

#[rstest]
#[case("xyz:1")]
#[case("int:not-a-number")]
#[case("cws:word:i:unicorn")]
#[case("cws:lemma:i:the")]
#[case("cwo:word:x:the")]
#[case("str:bad$XXescape")]
#[case("mul,int:1,foo:2")]
fn test_invalid_values(#[case] serialized: &str) {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let segment = open_segment(&dir);
    let collators = Collators::new(CollatorConfig::default()).unwrap();
    let context = GroupingContext::new(segment.forward_index().unwrap(), &collators);

    assert_eq!(context.deserialize(serialized), None);
}

#[test]
fn test_compare() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let segment = open_segment(&dir);
    let collators = Collators::new(CollatorConfig::default()).unwrap();
    let context = GroupingContext::new(segment.forward_index().unwrap(), &collators);

    let word = |sensitivity, terms: &[&str]| {
        PropertyValue::ContextWords(words(&segment, sensitivity, terms))
    };

    // Through the collated order of the terms
    let brown = word(Sensitivity::Insensitive, &["brown"]);
    let the = word(Sensitivity::Insensitive, &["the"]);
    assert_eq!(context.compare(&brown, &the).unwrap(), Ordering::Less);
    assert_eq!(
        context
            .compare(
                &word(Sensitivity::Sensitive, &["the"]),
                &word(Sensitivity::Sensitive, &["The"])
            )
            .unwrap(),
        Ordering::Less
    );
    assert_eq!(
        context
            .compare(&the, &word(Sensitivity::Insensitive, &["the", "lazy"]))
            .unwrap(),
        Ordering::Less
    );

    assert_eq!(
        context
            .compare(&PropertyValue::Int(10), &PropertyValue::Int(9))
            .unwrap(),
        Ordering::Greater
    );
    assert_eq!(
        context
            .compare(&PropertyValue::decade(1987), &PropertyValue::Decade(1980))
            .unwrap(),
        Ordering::Equal
    );
    assert_eq!(
        context
            .compare(
                &PropertyValue::Str("apple".to_string()),
                &PropertyValue::Str("Banana".to_string())
            )
            .unwrap(),
        Ordering::Less
    );

    let a = PropertyValue::Multiple(vec![PropertyValue::Int(1), PropertyValue::Str("b".into())]);
    let b = PropertyValue::Multiple(vec![PropertyValue::Int(1), PropertyValue::Str("c".into())]);
    assert_eq!(context.compare(&a, &b).unwrap(), Ordering::Less);

    // Values of different kinds are ordered by kind
    assert_eq!(
        context
            .compare(&PropertyValue::Int(1000), &PropertyValue::Str("a".into()))
            .unwrap(),
        Ordering::Less
    );
}
