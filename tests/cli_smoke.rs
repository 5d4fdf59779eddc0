use std::path::{Path, PathBuf};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_layercast")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "layercast.exe"
            } else {
                "layercast"
            });
            p
        })
}

fn write_png(path: &Path, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(16, 16, image::Rgba(rgba))
        .save(path)
        .unwrap();
}

fn assets_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("cli_smoke").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    write_png(&dir.join("default.png"), [0, 0, 255, 255]);
    write_png(&dir.join("arrow.png"), [255, 0, 0, 255]);
    write_png(&dir.join("green_overlay.png"), [0, 255, 0, 255]);
    dir
}

#[test]
fn cli_compose_writes_png() {
    let dir = assets_dir("compose");
    let config_path = dir.join("config.json");
    std::fs::write(&config_path, r#"{"canvas":{"width":64,"height":64}}"#).unwrap();
    let out_path = dir.join("out.png");
    let _ = std::fs::remove_file(&out_path);

    let status = std::process::Command::new(exe())
        .arg("--config")
        .arg(&config_path)
        .arg("--assets")
        .arg(&dir)
        .args(["compose", "--trigger", "tinted-pointer-solid", "--out"])
        .arg(&out_path)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (64, 64));
}

#[test]
fn cli_presets_lists_default_first_marker() {
    let output = std::process::Command::new(exe())
        .arg("presets")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("* pointer"), "{stdout}");
    assert!(stdout.contains("tinted-pointer-solid"), "{stdout}");
}

#[test]
fn cli_publish_to_dir_prints_links() {
    let dir = assets_dir("publish");
    let store = dir.join("store");

    let output = std::process::Command::new(exe())
        .arg("--assets")
        .arg(&dir)
        .args(["publish", "--dir"])
        .arg(&store)
        .args(["--public-base", "https://cdn.example.com/"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let key = v["key"].as_str().unwrap();
    assert!(store.join(key).exists());
    assert!(
        v["links"]["mint"]
            .as_str()
            .unwrap()
            .starts_with("https://zora.co/create/edition?image=https")
    );
}

#[test]
fn cli_rejects_unknown_trigger() {
    let dir = assets_dir("unknown_trigger");
    let status = std::process::Command::new(exe())
        .arg("--assets")
        .arg(&dir)
        .args(["data-url", "--trigger", "trigger9"])
        .status()
        .unwrap();
    assert!(!status.success());
}
