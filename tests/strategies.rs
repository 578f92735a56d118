//! End-to-end tests for the per-format strategies, driven through the
//! `Decompiler` entry point with a canned fetcher.
mod common;
use common::*;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use fukugen::error::DecompileError;
use fukugen::prelude::*;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::fs;

fn meta_url(work_id: i64) -> String {
    format!("https://api.codemao.cn/creation-tools/v1/works/{work_id}")
}

#[test]
fn test_unknown_work_type_is_unsupported() {
    let fetcher = FakeFetcher::new().with_json(
        &meta_url(1),
        json!({"id": 1, "work_name": "thing", "type": "HOLOGRAM"}),
    );
    let decompiler = Decompiler::with_fetcher(Box::new(fetcher));
    let out = tempfile::tempdir().unwrap();

    match decompiler.decompile(1, out.path()) {
        Err(DecompileError::UnsupportedFormat { type_name }) => {
            assert_eq!(type_name, "HOLOGRAM");
        }
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
}

#[test]
fn test_kitten_work_end_to_end() {
    let compiled = json!({
        "theatre": {
            "actors": {
                "actor1": {"id": "actor1", "name": "小猫", "type": "sprite"},
            },
            "scenes": {},
        },
        "compile_result": [{
            "id": "actor1",
            "procedures": {},
            "compiled_block_map": {
                "start": {
                    "id": "start", "type": "when_flag_clicked", "params": {},
                    "next_block": {"id": "say", "type": "self_say", "params": {"TEXT": "hi"}},
                },
            },
        }],
        "preview": "http://example/preview.png",
        "author_nickname": "someone",
    });

    let fetcher = FakeFetcher::new()
        .with_json(
            &meta_url(99),
            json!({"id": 99, "work_name": "My Game", "type": "KITTEN3", "bcm_version": "0.17.0"}),
        )
        .with_json(
            "https://api-creation.codemao.cn/kitten/r2/work/player/load/99",
            json!({"source_urls": ["https://static.example/99/compiled.json"]}),
        )
        .with_json("https://static.example/99/compiled.json", compiled);

    let decompiler = Decompiler::with_fetcher(Box::new(fetcher));
    let out = tempfile::tempdir().unwrap();
    let saved = decompiler.decompile(99, out.path()).expect("decompilation");

    assert!(saved.is_absolute());
    assert_eq!(saved.file_name().unwrap(), "My Game_99.bcm");

    let doc: Value = serde_json::from_str(&fs::read_to_string(&saved).unwrap()).unwrap();

    // The compiled payload is gone, the editor metadata is back.
    assert!(doc.get("compile_result").is_none());
    assert!(doc.get("preview").is_none());
    assert_eq!(doc["project_name"], json!("My Game"));
    assert_eq!(doc["toolbox_order"].as_array().unwrap().len(), 27);

    // The actor carries its reconstructed graph.
    let block_data = &doc["theatre"]["actors"]["actor1"]["block_data_json"];
    assert!(block_data["blocks"]["start"].is_object());
    assert_eq!(
        block_data["blocks"]["say"]["parent_id"],
        json!("start")
    );
    assert_eq!(
        block_data["connections"]["start"]["say"]["type"],
        json!("next")
    );
    assert_eq!(block_data["comments"], json!({}));
}

#[test]
fn test_kitten_actor_missing_from_theatre_gets_a_stub() {
    let compiled = json!({
        "theatre": {"actors": {}, "scenes": {}},
        "compile_result": [{
            "id": "lost",
            "procedures": {},
            "compiled_block_map": {
                "b1": {"id": "b1", "type": "self_say", "params": {}},
            },
        }],
    });

    let fetcher = FakeFetcher::new()
        .with_json(&meta_url(7), json!({"id": 7, "name": "w", "type": "KITTEN2"}))
        .with_json(
            "https://api-creation.codemao.cn/kitten/r2/work/player/load/7",
            json!({"source_urls": ["https://static.example/7.json"]}),
        )
        .with_json("https://static.example/7.json", compiled);

    let decompiler = Decompiler::with_fetcher(Box::new(fetcher));
    let out = tempfile::tempdir().unwrap();
    let saved = decompiler.decompile(7, out.path()).expect("decompilation");

    let doc: Value = serde_json::from_str(&fs::read_to_string(&saved).unwrap()).unwrap();
    let stub = &doc["theatre"]["actors"]["lost"];
    assert_eq!(stub["name"], json!("未知角色_lost"));
    assert!(stub["block_data_json"]["blocks"]["b1"].is_object());
}

#[test]
fn test_neko_work_decrypts_and_saves_document() {
    let plaintext_doc = json!({"scenes": [{"id": "s1"}], "variables": {}});
    let plaintext = serde_json::to_vec(&plaintext_doc).unwrap();

    let key: [u8; 32] = Sha256::digest((0u8..31).collect::<Vec<u8>>()).into();
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let nonce = [9u8; 12];
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .unwrap();
    let mut envelope = nonce.to_vec();
    envelope.extend(ciphertext);
    let obfuscated: String = STANDARD.encode(envelope).chars().rev().collect();

    let fetcher = FakeFetcher::new()
        .with_json(
            &meta_url(55),
            json!({"id": 55, "work_name": "秘密", "type": "NEKO"}),
        )
        .with_json(
            "https://api-creation.codemao.cn/neko/community/player/published-work-detail/55",
            json!({"source_urls": ["https://static.example/55.enc"]}),
        )
        .with_text("https://static.example/55.enc", &obfuscated);

    let decompiler = Decompiler::with_fetcher(Box::new(fetcher));
    let out = tempfile::tempdir().unwrap();
    let saved = decompiler.decompile(55, out.path()).expect("decompilation");

    assert_eq!(saved.file_name().unwrap(), "秘密_55.json");
    let doc: Value = serde_json::from_str(&fs::read_to_string(&saved).unwrap()).unwrap();
    assert_eq!(doc, plaintext_doc);
}

#[test]
fn test_coco_work_is_restructured_for_the_editor() {
    let compiled = json!({
        "id": "internal",
        "screenList": [
            {"id": "scr1", "widgetIds": ["w1"], "invisibleWidgetIds": []},
        ],
        "widgetMap": {
            "w1": {"id": "w1", "kind": "button"},
            "w2": {"id": "w2", "kind": "label"},
        },
        "blockJsonMap": {"scr1": {"blocks": []}},
        "variableMap": {
            "v1": 5,
            "v2": [1, 2],
            "v3": {"k": true},
        },
        "imageFileMap": {"img1": {"id": "img1"}},
        "apiToken": "secret",
    });

    let fetcher = FakeFetcher::new()
        .with_json(
            &meta_url(31),
            json!({"id": 31, "name": "app", "type": "COCO", "user_id": 1234}),
        )
        .with_json(
            "https://api-creation.codemao.cn/coconut/web/work/31/load",
            json!({"data": {"bcmc_url": "https://static.example/31.bcmc"}}),
        )
        .with_json("https://static.example/31.bcmc", compiled);

    let decompiler = Decompiler::with_fetcher(Box::new(fetcher));
    let out = tempfile::tempdir().unwrap();
    let saved = decompiler.decompile(31, out.path()).expect("decompilation");

    let doc: Value = serde_json::from_str(&fs::read_to_string(&saved).unwrap()).unwrap();

    assert_eq!(doc["authorId"], json!(1234));
    assert_eq!(doc["title"], json!("app"));
    assert_eq!(doc["screenIds"], json!(["scr1"]));

    // The screen claimed its widget; the leftover stays global.
    assert!(doc["screens"]["scr1"]["widgets"]["w1"].is_object());
    assert_eq!(doc["globalWidgetIds"], json!(["w2"]));

    // Variables are classified by shape with counter names.
    assert_eq!(doc["globalVariableList"][0]["name"], json!("变量1"));
    assert_eq!(doc["globalArrayList"][0]["name"], json!("列表1"));
    assert_eq!(doc["globalObjectList"][0]["name"], json!("字典1"));

    // Blockly workspaces wrap the compiled block JSON.
    assert_eq!(
        doc["blockly"]["scr1"]["workspaceJson"],
        json!({"blocks": []})
    );
    assert_eq!(doc["imageFileList"], json!([{"id": "img1"}]));

    // Compiled-only keys are stripped.
    for key in ["apiToken", "blockJsonMap", "screenList", "variableMap", "widgetMap", "id"] {
        assert!(doc.get(key).is_none(), "key '{key}' should be removed");
    }
}

#[test]
fn test_nemo_work_unpacks_into_directory_tree() {
    let bcm = json!({
        "styles": {
            "styles_dict": {
                "st1": {"url": "https://static.example/img1.png"},
            },
        },
    });

    let fetcher = FakeFetcher::new()
        .with_json(&meta_url(12), json!({"id": 12, "name": "n", "type": "NEMO"}))
        .with_json(
            "https://api.codemao.cn/creation-tools/v1/works/12/source/public",
            json!({
                "name": "n",
                "bcm_version": "0.16.2",
                "preview": "https://static.example/cover.png",
                "work_urls": ["https://static.example/12.bcm"],
            }),
        )
        .with_json("https://static.example/12.bcm", bcm)
        .with_bytes("https://static.example/cover.png", vec![1, 2, 3])
        .with_bytes("https://static.example/img1.png", vec![4, 5, 6]);

    let decompiler = Decompiler::with_fetcher(Box::new(fetcher));
    let out = tempfile::tempdir().unwrap();
    let saved = decompiler.decompile(12, out.path()).expect("decompilation");

    assert!(saved.ends_with("nemo_work_12"));
    assert!(saved.join("user_works/12/12.bcm").is_file());
    assert!(saved.join("user_works/12/12.meta").is_file());
    assert!(saved.join("user_works/12/12.cover").is_file());

    let image_hash = format!("{:x}", Sha256::digest(b"https://static.example/img1.png"));
    assert!(
        saved
            .join("user_material")
            .join(format!("{image_hash}.webp"))
            .is_file()
    );

    let userimg: Value = serde_json::from_str(
        &fs::read_to_string(saved.join("user_works/12/12.userimg")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        userimg["user_img_dict"]["st1"]["path"],
        json!(format!("user_material/{image_hash}.webp"))
    );
}

#[test]
fn test_nemo_missing_media_is_not_fatal() {
    let bcm = json!({
        "styles": {"styles_dict": {"st1": {"url": "https://static.example/gone.png"}}},
    });

    let fetcher = FakeFetcher::new()
        .with_json(&meta_url(13), json!({"id": 13, "name": "n", "type": "NEMO"}))
        .with_json(
            "https://api.codemao.cn/creation-tools/v1/works/13/source/public",
            json!({"name": "n", "bcm_version": "0.16.2", "work_urls": ["https://static.example/13.bcm"]}),
        )
        .with_json("https://static.example/13.bcm", bcm);

    let decompiler = Decompiler::with_fetcher(Box::new(fetcher));
    let out = tempfile::tempdir().unwrap();

    // The style image URL has no canned response; the work still unpacks.
    let saved = decompiler.decompile(13, out.path()).expect("decompilation");
    assert!(saved.join("user_works/13/13.bcm").is_file());
}

#[test]
fn test_filename_sanitization_falls_back_for_hostile_names() {
    assert_eq!(safe_filename("../../etc", 42, ".bcm"), "work_42.bcm");
    assert_eq!(safe_filename("", 7, ".json"), "work_7.json");
    assert_eq!(safe_filename("!!!", 9, ".json"), "work_9.json");
    assert_eq!(safe_filename("My Game", 5, ".bcm"), "My Game_5.bcm");
    assert_eq!(safe_filename("小猫 v2", 3, ".json"), "小猫 v2_3.json");
    assert_eq!(safe_filename("a/b", 4, ""), "work_4");
}
