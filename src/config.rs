use crate::audio::LevelParams;

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: &'static str,
    pub app_version: &'static str,

    // 气压传感器进程配置
    pub sensor_local_ip: &'static str,
    pub sensor_local_port: u16,
    pub sensor_buffer_size: usize,

    // GUI进程配置
    pub gui_local_ip: &'static str,
    pub gui_local_port: u16,
    pub gui_remote_ip: &'static str,
    pub gui_remote_port: u16,
    pub gui_buffer_size: usize,

    // 采集设备
    pub raw_capture_device: String,
    pub standard_capture_device: String,

    // 分贝估计参数
    pub level_offset_db: f64,
    pub level_min_db: f64,
    pub level_max_db: f64,
    pub level_smoothing: f64,
    pub level_epsilon: f64,

    pub sea_level_hpa: f32,

    // 会话
    pub auto_start: bool,
    pub microphone_permission: bool,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),

            sensor_local_ip: env!("SENSOR_LOCAL_IP"),
            sensor_local_port: env!("SENSOR_LOCAL_PORT").parse()
                .map_err(|_| "Failed to parse SENSOR_LOCAL_PORT")?,
            sensor_buffer_size: env!("SENSOR_BUFFER_SIZE").parse()
                .map_err(|_| "Failed to parse SENSOR_BUFFER_SIZE")?,

            gui_local_ip: env!("GUI_LOCAL_IP"),
            gui_local_port: env!("GUI_LOCAL_PORT").parse()
                .map_err(|_| "Failed to parse GUI_LOCAL_PORT")?,
            gui_remote_ip: env!("GUI_REMOTE_IP"),
            gui_remote_port: env!("GUI_REMOTE_PORT").parse()
                .map_err(|_| "Failed to parse GUI_REMOTE_PORT")?,
            gui_buffer_size: env!("GUI_BUFFER_SIZE").parse()
                .map_err(|_| "Failed to parse GUI_BUFFER_SIZE")?,

            raw_capture_device: env!("AUDIO_RAW_DEVICE").to_string(),
            standard_capture_device: env!("AUDIO_STANDARD_DEVICE").to_string(),

            level_offset_db: env!("LEVEL_OFFSET_DB").parse()
                .map_err(|_| "Failed to parse LEVEL_OFFSET_DB")?,
            level_min_db: env!("LEVEL_MIN_DB").parse()
                .map_err(|_| "Failed to parse LEVEL_MIN_DB")?,
            level_max_db: env!("LEVEL_MAX_DB").parse()
                .map_err(|_| "Failed to parse LEVEL_MAX_DB")?,
            level_smoothing: env!("LEVEL_SMOOTHING").parse()
                .map_err(|_| "Failed to parse LEVEL_SMOOTHING")?,
            level_epsilon: env!("LEVEL_EPSILON").parse()
                .map_err(|_| "Failed to parse LEVEL_EPSILON")?,

            sea_level_hpa: env!("SEA_LEVEL_HPA").parse()
                .map_err(|_| "Failed to parse SEA_LEVEL_HPA")?,

            auto_start: env!("SESSION_AUTO_START").parse()
                .map_err(|_| "Failed to parse SESSION_AUTO_START")?,
            microphone_permission: env!("SESSION_MICROPHONE_PERMISSION").parse()
                .map_err(|_| "Failed to parse SESSION_MICROPHONE_PERMISSION")?,
        })
    }

    /// Level estimator parameters, validated against the estimator's domain.
    pub fn level_params(&self) -> Result<LevelParams, &'static str> {
        LevelParams::new(
            self.level_offset_db,
            self.level_min_db,
            self.level_max_db,
            self.level_smoothing,
            self.level_epsilon,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new().expect("Failed to create default Config from build-time environment variables")
    }
}
