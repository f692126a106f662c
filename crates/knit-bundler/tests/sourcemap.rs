//! Source maps point every emitted statement back at its original file.

mod helpers;

use helpers::{mapped_lines, options, original_position};

const MATH: (&str, &str) = ("math.js", "export const add = (a, b) => a + b;\n");
const MAIN: (&str, &str) = (
    "main.js",
    "import { add } from './math.js';\nconsole.log(add(1, 2));\n",
);

fn map_json(output: &knit_bundler::BuildOutput) -> serde_json::Value {
    let map = output.chunks[0].map.as_ref().expect("map requested");
    serde_json::from_str(&map.to_json_string()).unwrap()
}

#[tokio::test]
async fn no_map_unless_requested() {
    let output = options(&[MAIN, MATH]).build().await.unwrap();
    let chunk = &output.chunks[0];
    assert!(chunk.map.is_none());
    assert_eq!(chunk.code_with_map_url(), chunk.code);
}

#[tokio::test]
async fn map_lists_sources_in_render_order() {
    let output = options(&[MAIN, MATH]).sourcemap(true).build().await.unwrap();
    let json = map_json(&output);

    assert_eq!(json["version"], 3);
    assert_eq!(json["file"], "main.js");
    assert_eq!(json["sources"], serde_json::json!(["math.js", "main.js"]));
    assert_eq!(
        json["sourcesContent"],
        serde_json::json!([MATH.1, MAIN.1])
    );
}

#[tokio::test]
async fn statements_map_to_their_original_lines() {
    let output = options(&[MAIN, MATH]).sourcemap(true).build().await.unwrap();
    assert_eq!(
        output.chunks[0].code,
        "// math.js\nconst add = (a, b) => a + b;\n\n// main.js\nconsole.log(add(1, 2));\n"
    );

    let map = output.chunks[0].map.as_ref().unwrap();
    // headers and blank lines are synthesized
    assert_eq!(mapped_lines(map), vec![1, 4]);
    // `export ` is stripped, so the declaration starts at column 7
    assert_eq!(original_position(map, 1, 0), Some((0, 0, 7)));
    assert_eq!(original_position(map, 4, 0), Some((1, 1, 0)));
}

#[tokio::test]
async fn renamed_identifiers_carry_original_names() {
    let output = options(&[
        (
            "main.js",
            "import { value as a } from './a.js';\nconst value = 'main';\nconsole.log(a, value);",
        ),
        ("a.js", "export const value = 'a';"),
    ])
    .sourcemap(true)
    .build()
    .await
    .unwrap();

    let code = &output.chunks[0].code;
    assert!(code.contains("console.log(value, value$1);"), "{}", code);

    let json = map_json(&output);
    let names: Vec<&str> = json["names"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|name| name.as_str())
        .collect();
    assert!(names.contains(&"a"));
    assert!(names.contains(&"value"));

    // `value$1` on line 5 points at `value` in `console.log(a, value)`
    let map = output.chunks[0].map.as_ref().unwrap();
    assert_eq!(original_position(map, 5, 19), Some((1, 2, 15)));
    let renamed = map
        .get_tokens()
        .find(|token| token.get_dst_line() == 5 && token.get_dst_col() == 19)
        .and_then(|token| token.get_name_id())
        .and_then(|id| map.get_name(id))
        .map(|name| name.to_string());
    assert_eq!(renamed, Some("value".to_string()));
}

#[tokio::test]
async fn map_url_is_appended_to_code() {
    let output = options(&[MAIN, MATH])
        .sourcemap(true)
        .entry_file_names("js/[name].js")
        .build()
        .await
        .unwrap();
    let chunk = &output.chunks[0];

    assert_eq!(chunk.file_name, "js/main.js");
    assert_eq!(chunk.map_file_name(), "js/main.js.map");
    assert!(
        chunk
            .code_with_map_url()
            .ends_with("console.log(add(1, 2));\n//# sourceMappingURL=main.js.map\n")
    );
}
