use serde::Deserialize;
use topic_quiz::json_utils::{find_json_structures, parse_payload, NodeType};
use topic_quiz::QuizQuestion;

#[derive(Debug, Deserialize, PartialEq)]
struct Item { x: i32 }

#[test]
fn parse_payload_plain_array() {
    let s = r#"[{"x":1},{"x":2},{"x":3}]"#;
    let v: Vec<Item> = parse_payload(s).unwrap();
    assert_eq!(v.len(), 3);
    assert_eq!(v[0].x, 1);
    assert_eq!(v[2].x, 3);
}

#[test]
fn parse_payload_skips_objects_and_takes_first_matching_array() {
    let s = r#"prefix {"y":99} middle ["a","b"] then [{"x":7},{"x":8}] and [{"x":9}]"#;
    let v: Vec<Item> = parse_payload(s).unwrap();
    assert_eq!(v, vec![Item { x: 7 }, Item { x: 8 }]);
}

#[test]
fn parse_payload_finds_array_nested_in_object() {
    let s = r#"{"quiz": [{"x":4}]}"#;
    let v: Vec<Item> = parse_payload(s).unwrap();
    assert_eq!(v, vec![Item { x: 4 }]);
}

#[test]
fn parse_payload_without_array_fails() {
    assert!(parse_payload::<Item>("no json here").is_err());
    assert!(parse_payload::<Item>(r#"{"x":1}"#).is_err());
}

#[test]
fn brackets_inside_strings_do_not_split_structures() {
    let s = r#"note: [{"x":1,"s":"a ] and } inside"}] done"#;
    let roots = find_json_structures(s);
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].kind, NodeType::Array);
    assert_eq!(roots[0].slice(s), r#"[{"x":1,"s":"a ] and } inside"}]"#);
    assert_eq!(roots[0].children.len(), 1);
}

#[test]
fn quiz_questions_from_fenced_model_output() {
    let s = r#"
Sure! Here are five questions.
```json
[
  {"id":1,"question":"Which gas do plants absorb?","options":["Oxygen","Carbon dioxide","Nitrogen","Helium"],"correctAnswerIndex":1,"explanation":"Plants take in CO2 for photosynthesis."},
  {"id":2,"question":"What is H2O?","options":["Salt","Water","Sugar","Air"],"correctAnswerIndex":1,"explanation":"Two hydrogens and one oxygen."}
]
```
Good luck!
"#;
    let questions: Vec<QuizQuestion> = parse_payload(s).unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].prompt, "Which gas do plants absorb?");
    assert_eq!(questions[0].correct_option_index, 1);
    assert!(questions[1].is_correct(1));
    assert_eq!(questions[1].options[1], "Water");
}

#[test]
fn parse_payload_ignores_empty_arrays_inside_other_documents() {
    assert!(parse_payload::<QuizQuestion>(r#"{"error":"quota","details":[]}"#).is_err());
    assert!(parse_payload::<Item>(r#"Nothing yet [] but later [{"x":5}]"#).is_ok_and(|v| v == vec![Item { x: 5 }]));

    let top_level: Vec<Item> = parse_payload(" [] ").unwrap();
    assert!(top_level.is_empty());
}
