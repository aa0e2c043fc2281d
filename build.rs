use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    sensor: Sensor,
    gui: Gui,
    audio: Audio,
    level: Level,
    altitude: Altitude,
    session: Session,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Sensor {
    local_ip: String,
    local_port: u16,
    buffer_size: usize,
}

#[derive(Deserialize)]
struct Gui {
    local_ip: String,
    local_port: u16,
    remote_ip: String,
    remote_port: u16,
    buffer_size: usize,
}

#[derive(Deserialize)]
struct Audio {
    raw_device: String,
    standard_device: String,
}

#[derive(Deserialize)]
struct Level {
    offset_db: f64,
    min_db: f64,
    max_db: f64,
    smoothing: f64,
    epsilon: f64,
}

#[derive(Deserialize)]
struct Altitude {
    sea_level_hpa: f32,
}

#[derive(Deserialize)]
struct Session {
    auto_start: bool,
    microphone_permission: bool,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 传感器进程
    println!("cargo:rustc-env=SENSOR_LOCAL_IP={}", config.sensor.local_ip);
    println!("cargo:rustc-env=SENSOR_LOCAL_PORT={}", config.sensor.local_port);
    println!("cargo:rustc-env=SENSOR_BUFFER_SIZE={}", config.sensor.buffer_size);

    // GUI 配置
    println!("cargo:rustc-env=GUI_LOCAL_IP={}", config.gui.local_ip);
    println!("cargo:rustc-env=GUI_LOCAL_PORT={}", config.gui.local_port);
    println!("cargo:rustc-env=GUI_REMOTE_IP={}", config.gui.remote_ip);
    println!("cargo:rustc-env=GUI_REMOTE_PORT={}", config.gui.remote_port);
    println!("cargo:rustc-env=GUI_BUFFER_SIZE={}", config.gui.buffer_size);

    // 采集设备
    println!("cargo:rustc-env=AUDIO_RAW_DEVICE={}", config.audio.raw_device);
    println!("cargo:rustc-env=AUDIO_STANDARD_DEVICE={}", config.audio.standard_device);

    // 分贝估计参数
    println!("cargo:rustc-env=LEVEL_OFFSET_DB={}", config.level.offset_db);
    println!("cargo:rustc-env=LEVEL_MIN_DB={}", config.level.min_db);
    println!("cargo:rustc-env=LEVEL_MAX_DB={}", config.level.max_db);
    println!("cargo:rustc-env=LEVEL_SMOOTHING={}", config.level.smoothing);
    println!("cargo:rustc-env=LEVEL_EPSILON={:e}", config.level.epsilon);

    println!("cargo:rustc-env=SEA_LEVEL_HPA={}", config.altitude.sea_level_hpa);

    println!("cargo:rustc-env=SESSION_AUTO_START={}", config.session.auto_start);
    println!(
        "cargo:rustc-env=SESSION_MICROPHONE_PERMISSION={}",
        config.session.microphone_permission
    );
}
