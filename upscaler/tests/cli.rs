use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use image::{DynamicImage, GenericImageView, ImageReader, Rgb, RgbImage};
use sr_models::{Architecture, Checkpoint, ModelConfig, SrModel};

fn upscaler(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_upscaler"))
        .args(args)
        .env("UPSCALER_DEVICE", "cpu")
        .env("RUST_LOG", "warn")
        .output()
        .expect("run upscaler")
}

fn run(input: &Path, output: &Path, weights: &Path, method: &str, scale: &str) -> Output {
    upscaler(&[input, output, weights, Path::new(method), Path::new(scale)])
}

fn write_input(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 2) as u8, (y * 2) as u8, 128]))
        .save(&path)
        .expect("write input image");
    path
}

/// Random weights for `arch` at `scale`, with a small model config sidecar.
fn write_checkpoint(path: &Path, arch: Architecture, scale: usize) {
    let config = ModelConfig {
        channels: 8,
        num_blocks: 1,
        res_scale: 0.1,
    };
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    SrModel::new(arch, scale, &config, vb).expect("build model");
    let tensors: HashMap<_, _> = varmap
        .data()
        .lock()
        .expect("varmap lock")
        .iter()
        .map(|(name, var)| (name.clone(), var.as_tensor().clone()))
        .collect();
    Checkpoint::new(tensors).save(path).expect("save checkpoint");

    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".json");
    let json = format!(
        r#"{{"channels": {}, "num_blocks": {}, "res_scale": {}}}"#,
        config.channels, config.num_blocks, config.res_scale
    );
    std::fs::write(sidecar, json).expect("write config sidecar");
}

fn write_espcn_checkpoint(path: &Path, scale: usize) {
    write_checkpoint(path, Architecture::Espcn, scale);
}

/// Decodes by content; outputs are often named without a usable extension.
fn decode(path: &Path) -> DynamicImage {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .expect("open output")
        .decode()
        .expect("decode output")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn bicubic_doubles_and_reports_result_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(dir.path(), "in.png", 100, 100);
    let output = dir.path().join("processed").join("in.png_BICUBIC_2");

    let out = run(&input, &output, Path::new("none"), "bicubic", "2");
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), format!("RESULT_PATH:{}", output.display()));

    assert_eq!(decode(&output).dimensions(), (200, 200));
}

#[test]
fn bilinear_ignores_weights() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(dir.path(), "in.png", 7, 5);
    let output = dir.path().join("out.png");
    let garbage = dir.path().join("garbage.pth");
    std::fs::write(&garbage, b"definitely not a checkpoint").expect("write garbage");

    let out = run(&input, &output, &garbage, "Bilinear", "3");
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert_eq!(decode(&output).dimensions(), (21, 15));
}

#[test]
fn missing_input_is_file_not_found_for_every_method() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("nope.png");
    let scale = 2;

    for method in ["espcn", "edsr", "srgan", "bilinear", "bicubic"] {
        let weights = dir.path().join(format!("{method}_x{scale}.safetensors"));
        let arch: Architecture = method.parse().unwrap_or(Architecture::Espcn);
        write_checkpoint(&weights, arch, scale);

        let out = run(&input, &dir.path().join("out.png"), &weights, method, &scale.to_string());
        assert_eq!(out.status.code(), Some(1), "{method}");
        let err = stderr(&out);
        assert!(err.contains("error: file not found"), "{method} stderr: {err}");
        assert!(err.contains("nope.png"), "{method} stderr: {err}");
        assert!(!stdout(&out).contains("RESULT_PATH:"), "{method}");
    }
}

#[test]
fn unknown_model_is_a_parameter_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(dir.path(), "in.png", 4, 4);

    let out = run(&input, &dir.path().join("out.png"), Path::new("none"), "unknown_model", "2");
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("parameter error"), "stderr: {err}");
    assert!(err.contains("unknown_model"), "stderr: {err}");
}

#[test]
fn wrong_argument_count_is_a_usage_error() {
    let out = upscaler(&[Path::new("in.png"), Path::new("out.png")]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Usage"), "stderr: {}", stderr(&out));
}

#[test]
fn zero_scale_is_a_usage_error() {
    let out = run(Path::new("in.png"), Path::new("out.png"), Path::new("none"), "bicubic", "0");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn espcn_doubles_with_a_safetensors_checkpoint() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(dir.path(), "in.png", 12, 9);
    let weights = dir.path().join("espcn_x2.safetensors");
    write_espcn_checkpoint(&weights, 2);
    let output = dir.path().join("in.png_ESPCN_2");

    let out = run(&input, &output, &weights, "espcn", "2");
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("RESULT_PATH:"));
    assert_eq!(decode(&output).dimensions(), (24, 18));
}

#[test]
fn missing_weights_is_file_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(dir.path(), "in.png", 4, 4);
    let weights = dir.path().join("EDSR_x2.pth");

    let out = run(&input, &dir.path().join("out.png"), &weights, "edsr", "2");
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error: file not found"), "stderr: {err}");
    assert!(err.contains("EDSR_x2.pth"), "stderr: {err}");
}

#[test]
fn mismatched_checkpoint_fails_to_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(dir.path(), "in.png", 4, 4);
    let weights = dir.path().join("espcn_x2.safetensors");
    write_espcn_checkpoint(&weights, 2);

    let out = run(&input, &dir.path().join("out.png"), &weights, "edsr", "2");
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("error: failed to load weights"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn checksum_sidecar_is_enforced() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(dir.path(), "in.png", 4, 4);
    let weights = dir.path().join("espcn_x2.safetensors");
    write_espcn_checkpoint(&weights, 2);
    std::fs::write(
        dir.path().join("espcn_x2.safetensors.sha256"),
        format!("{}  espcn_x2.safetensors\n", "0".repeat(64)),
    )
    .expect("write sidecar");

    let out = run(&input, &dir.path().join("out.png"), &weights, "espcn", "2");
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("error: failed to load weights"),
        "stderr: {}",
        stderr(&out)
    );
}
