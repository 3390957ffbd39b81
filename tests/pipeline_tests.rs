use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use tempfile::tempdir;

use segprep::config::{BlurConfig, JitterConfig, JitterVariant, ToolsConfig};
use segprep::{remap_dataset, run_augmentation, split_dataset, ClassRemap, SplitOptions};

fn test_image(seed: u32) -> RgbImage {
    RgbImage::from_fn(8, 8, |x, y| {
        Rgb([
            ((x * 31 + seed * 7) % 256) as u8,
            ((y * 17 + seed * 5) % 256) as u8,
            (((x + y) * 13 + seed) % 256) as u8,
        ])
    })
}

fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Build a dataset with `count` image/JSON/txt triples plus the
/// classification index.
fn make_dataset(root: &Path, name: &str, count: usize) -> PathBuf {
    let dataset = root.join(name);
    let images = dataset.join("images");
    let labels = dataset.join("labels");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&labels).unwrap();

    for i in 0..count {
        let stem = format!("img_{:02}", i);
        let img = test_image(i as u32);
        img.save_with_format(images.join(format!("{}.png", stem)), ImageFormat::Png)
            .unwrap();
        let annotation = json!({
            "version": "5.0.1",
            "imagePath": format!("{}.png", stem),
            "imageData": base64::encode(png_bytes(&img)),
            "shapes": [],
            "imageHeight": 8,
            "imageWidth": 8,
        });
        fs::write(
            labels.join(format!("{}.json", stem)),
            serde_json::to_string_pretty(&annotation).unwrap(),
        )
        .unwrap();
        fs::write(labels.join(format!("{}.txt", stem)), "0 0.5 0.5 0.2 0.2\n").unwrap();
    }
    fs::write(labels.join("classification.txt"), "ripe\nunripe\n").unwrap();
    dataset
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|n| n.starts_with(prefix))
        .collect();
    names.sort();
    names
}

#[test]
fn blur_sampled_run_is_deterministic() {
    let root = tempdir().unwrap();
    make_dataset(root.path(), "tomato", 10);

    let tools = ToolsConfig {
        blur: Some(BlurConfig {
            enabled: true,
            radius: 1.2,
            sample_ratio: Some(0.2),
            sample_seed: Some(42),
            ..BlurConfig::default()
        }),
        color_jitter: None,
    };

    let summaries = run_augmentation(root.path(), "tomato", &tools).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total, 2);
    assert_eq!(summaries[0].skipped, 0);

    let first = root.path().join("tomato_augment");
    let blurred = files_with_prefix(&first.join("images"), "blur_");
    assert_eq!(blurred.len(), 2);
    assert_eq!(files_with_prefix(&first.join("labels"), "blur_").len(), 4); // json + txt each

    // a second run lands in a fresh copy and picks the same identities
    run_augmentation(root.path(), "tomato", &tools).unwrap();
    let second = root.path().join("tomato_augment_1");
    assert_eq!(files_with_prefix(&second.join("images"), "blur_"), blurred);
}

#[test]
fn blur_output_triple_is_self_consistent() {
    let root = tempdir().unwrap();
    make_dataset(root.path(), "tomato", 3);

    let tools = ToolsConfig {
        blur: Some(BlurConfig {
            enabled: true,
            radius: 2.0,
            sample_ratio: Some(1.0),
            ..BlurConfig::default()
        }),
        color_jitter: None,
    };
    run_augmentation(root.path(), "tomato", &tools).unwrap();

    let augmented = root.path().join("tomato_augment");
    for i in 0..3 {
        let stem = format!("blur_img_{:02}", i);
        let img_path = augmented.join("images").join(format!("{}.png", stem));
        let json_path = augmented.join("labels").join(format!("{}.json", stem));
        let txt_path = augmented.join("labels").join(format!("{}.txt", stem));
        assert!(img_path.is_file());
        assert!(txt_path.is_file());

        let parsed: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(
            parsed["imagePath"].as_str().unwrap(),
            format!("{}.png", stem)
        );
        // untouched fields pass through
        assert_eq!(parsed["version"].as_str().unwrap(), "5.0.1");

        // imageData mirrors the written image
        let decoded = base64::decode(parsed["imageData"].as_str().unwrap()).unwrap();
        let embedded = image::load_from_memory(&decoded).unwrap().to_rgb8();
        let on_disk = image::open(&img_path).unwrap().to_rgb8();
        assert_eq!(embedded, on_disk);

        // txt labels are copied unchanged
        assert_eq!(fs::read_to_string(&txt_path).unwrap(), "0 0.5 0.5 0.2 0.2\n");
    }
}

#[test]
fn missing_image_is_skipped_without_partial_output() {
    let root = tempdir().unwrap();
    let dataset = make_dataset(root.path(), "tomato", 3);
    fs::remove_file(dataset.join("images").join("img_01.png")).unwrap();

    let tools = ToolsConfig {
        blur: Some(BlurConfig {
            enabled: true,
            radius: 1.0,
            sample_ratio: Some(1.0),
            ..BlurConfig::default()
        }),
        color_jitter: None,
    };
    let summaries = run_augmentation(root.path(), "tomato", &tools).unwrap();
    assert_eq!(summaries[0].total, 3);
    assert_eq!(summaries[0].skipped, 1);

    let augmented = root.path().join("tomato_augment");
    assert!(files_with_prefix(&augmented.join("images"), "blur_img_01").is_empty());
    assert!(files_with_prefix(&augmented.join("labels"), "blur_img_01").is_empty());
}

#[test]
fn jitter_identity_variant_reencodes_unchanged() {
    let root = tempdir().unwrap();
    make_dataset(root.path(), "tomato", 2);

    let tools = ToolsConfig {
        blur: None,
        color_jitter: Some(JitterConfig {
            enabled: true,
            variants: vec![JitterVariant::default()],
            sample_ratio: Some(1.0),
            sample_seed: Some(1),
            ..JitterConfig::default()
        }),
    };
    let summaries = run_augmentation(root.path(), "tomato", &tools).unwrap();
    assert_eq!(summaries[0].total, 2);
    assert_eq!(summaries[0].skipped, 0);

    let augmented = root.path().join("tomato_augment");
    for i in 0..2 {
        let img_path = augmented
            .join("images")
            .join(format!("identity_img_{:02}.png", i));
        let out = image::open(&img_path).unwrap().to_rgb8();
        assert_eq!(out, test_image(i as u32));

        let json_path = augmented
            .join("labels")
            .join(format!("identity_img_{:02}.json", i));
        let parsed: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(
            parsed["imagePath"].as_str().unwrap(),
            format!("identity_img_{:02}.png", i)
        );
        assert!(augmented
            .join("labels")
            .join(format!("identity_img_{:02}.txt", i))
            .is_file());
    }
}

#[test]
fn jitter_with_no_variants_is_a_noop() {
    let root = tempdir().unwrap();
    make_dataset(root.path(), "tomato", 2);

    let tools = ToolsConfig {
        blur: None,
        color_jitter: Some(JitterConfig {
            enabled: true,
            variants: Vec::new(),
            sample_ratio: Some(1.0),
            ..JitterConfig::default()
        }),
    };
    let summaries = run_augmentation(root.path(), "tomato", &tools).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total, 0);
    assert_eq!(summaries[0].skipped, 0);
}

#[test]
fn source_dataset_is_never_mutated() {
    let root = tempdir().unwrap();
    let dataset = make_dataset(root.path(), "tomato", 3);
    let before = files_with_prefix(&dataset.join("images"), "");
    let json_before = fs::read_to_string(dataset.join("labels").join("img_00.json")).unwrap();

    let tools = ToolsConfig {
        blur: Some(BlurConfig {
            enabled: true,
            radius: 4.0,
            sample_ratio: Some(1.0),
            ..BlurConfig::default()
        }),
        color_jitter: None,
    };
    run_augmentation(root.path(), "tomato", &tools).unwrap();

    assert_eq!(files_with_prefix(&dataset.join("images"), ""), before);
    assert_eq!(
        fs::read_to_string(dataset.join("labels").join("img_00.json")).unwrap(),
        json_before
    );
}

#[test]
fn remap_rewrites_labels_and_index() {
    let dir = tempdir().unwrap();
    let labels = dir.path().join("labels");
    fs::create_dir_all(&labels).unwrap();
    fs::write(labels.join("classification.txt"), "a\nb\nc\nd\n").unwrap();
    fs::write(
        labels.join("one.txt"),
        "2 0.5 0.5 0.2 0.2\n5 0.3 0.3 0.1 0.1\n3 0.1 0.2 0.3 0.4\n",
    )
    .unwrap();
    fs::write(labels.join("two.txt"), "3 0.9 0.9 0.1 0.1\n").unwrap();

    let map = ClassRemap::from_pairs(&[(2, 0), (3, 1)]).unwrap();
    let stats = remap_dataset(&labels, &map, true).unwrap();
    assert_eq!(stats.processed_files, 2);
    assert_eq!(stats.converted_annotations, 3);
    assert_eq!(stats.dropped_annotations, 1);

    assert_eq!(
        fs::read_to_string(labels.join("one.txt")).unwrap(),
        "0 0.5 0.5 0.2 0.2\n1 0.1 0.2 0.3 0.4\n"
    );
    assert_eq!(
        fs::read_to_string(labels.join("two.txt")).unwrap(),
        "1 0.9 0.9 0.1 0.1\n"
    );
    assert_eq!(
        fs::read_to_string(labels.join("classification.txt")).unwrap(),
        "c\nd\n"
    );

    // the backup still carries the original labels
    let backup = dir.path().join("labels_backup");
    assert_eq!(
        fs::read_to_string(backup.join("one.txt")).unwrap(),
        "2 0.5 0.5 0.2 0.2\n5 0.3 0.3 0.1 0.1\n3 0.1 0.2 0.3 0.4\n"
    );
    assert_eq!(
        fs::read_to_string(backup.join("classification.txt")).unwrap(),
        "a\nb\nc\nd\n"
    );
}

#[test]
fn remap_counts_background_line_when_resolving_ids() {
    // indexes written with a reserved background line start real classes
    // at id 1; the mapping must resolve against raw line positions
    let dir = tempdir().unwrap();
    let labels = dir.path().join("labels");
    fs::create_dir_all(&labels).unwrap();
    fs::write(
        labels.join("classification.txt"),
        "__background__\nfoo\nbar\nbaz\n",
    )
    .unwrap();
    fs::write(
        labels.join("one.txt"),
        "2 0.5 0.5 0.2 0.2\n3 0.1 0.2 0.3 0.4\n",
    )
    .unwrap();

    let map = ClassRemap::from_pairs(&[(2, 0), (3, 1)]).unwrap();
    let stats = remap_dataset(&labels, &map, false).unwrap();
    assert_eq!(stats.converted_annotations, 2);
    assert_eq!(stats.dropped_annotations, 0);

    assert_eq!(
        fs::read_to_string(labels.join("classification.txt")).unwrap(),
        "bar\nbaz\n"
    );
    assert_eq!(
        fs::read_to_string(labels.join("one.txt")).unwrap(),
        "0 0.5 0.5 0.2 0.2\n1 0.1 0.2 0.3 0.4\n"
    );
}

#[test]
fn remap_with_empty_index_is_fatal_before_writes() {
    let dir = tempdir().unwrap();
    let labels = dir.path().join("labels");
    fs::create_dir_all(&labels).unwrap();
    fs::write(labels.join("classification.txt"), "\n").unwrap();
    fs::write(labels.join("one.txt"), "2 0.5 0.5 0.2 0.2\n").unwrap();

    let map = ClassRemap::from_pairs(&[(2, 0)]).unwrap();
    assert!(remap_dataset(&labels, &map, true).is_err());

    // nothing was touched
    assert_eq!(
        fs::read_to_string(labels.join("one.txt")).unwrap(),
        "2 0.5 0.5 0.2 0.2\n"
    );
    assert!(!dir.path().join("labels_backup").exists());
}

#[test]
fn remap_refuses_to_overwrite_existing_backup() {
    let dir = tempdir().unwrap();
    let labels = dir.path().join("labels");
    fs::create_dir_all(&labels).unwrap();
    fs::create_dir_all(dir.path().join("labels_backup")).unwrap();
    fs::write(labels.join("classification.txt"), "a\nb\nc\n").unwrap();
    fs::write(labels.join("one.txt"), "2 0.5 0.5 0.2 0.2\n").unwrap();

    let map = ClassRemap::from_pairs(&[(2, 0)]).unwrap();
    assert!(remap_dataset(&labels, &map, true).is_err());
}

#[test]
fn split_end_to_end_with_manifest() {
    let root = tempdir().unwrap();
    make_dataset(root.path(), "tomato", 10);
    let out = root.path().join("datasets").join("tomato");

    let opts = SplitOptions {
        val_size: 0.2,
        test_size: 0.0,
        seed: 7,
    };
    let summary = split_dataset(root.path(), "tomato", &out, &opts).unwrap();
    assert_eq!(summary.train, 8);
    assert_eq!(summary.val, 2);
    assert_eq!(summary.test, 0);

    assert_eq!(files_with_prefix(&out.join("images").join("train"), "").len(), 8);
    assert_eq!(files_with_prefix(&out.join("images").join("val"), "").len(), 2);
    assert_eq!(files_with_prefix(&out.join("labels").join("train"), "").len(), 8);
    assert_eq!(files_with_prefix(&out.join("labels").join("val"), "").len(), 2);

    let manifest = fs::read_to_string(summary.manifest).unwrap();
    assert!(manifest.contains("path: tomato"));
    assert!(manifest.contains("train: images/train"));
    assert!(manifest.contains("val: images/val"));
    assert!(manifest.contains("nc: 2"));
    assert!(manifest.contains("  0: ripe"));
    assert!(manifest.contains("  1: unripe"));

    // same seed reproduces the same validation subset
    let out2 = root.path().join("datasets").join("tomato2");
    split_dataset(root.path(), "tomato", &out2, &opts).unwrap();
    assert_eq!(
        files_with_prefix(&out.join("images").join("val"), ""),
        files_with_prefix(&out2.join("images").join("val"), "")
    );
}

#[test]
fn split_with_missing_txt_is_fatal() {
    let root = tempdir().unwrap();
    let dataset = make_dataset(root.path(), "tomato", 4);
    fs::remove_file(dataset.join("labels").join("img_02.txt")).unwrap();

    let out = root.path().join("datasets").join("tomato");
    let opts = SplitOptions {
        val_size: 0.2,
        test_size: 0.1,
        seed: 42,
    };
    assert!(split_dataset(root.path(), "tomato", &out, &opts).is_err());
    assert!(!out.exists());
}
