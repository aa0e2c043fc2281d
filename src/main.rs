mod aggregator;
mod altitude;
mod audio;
mod config;
mod controller;
mod error;
mod gui_bridge;
mod notification;
mod protocol;
mod sensor_bridge;

use aggregator::{FusedReading, MeasurementAggregator};
use audio::AlsaPlatform;
use config::Config;
use controller::CoreController;
use gui_bridge::{GuiBridge, GuiEvent};
use notification::NotificationContent;
use sensor_bridge::{SensorBridge, SensorEvent};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    // 加载配置
    let config = Config::new().map_err(anyhow::Error::msg)?;
    let level_params = config.level_params().map_err(anyhow::Error::msg)?;
    log::info!("{} {} starting", config.app_name, config.app_version);

    // 传感器事件通道
    let (tx_sensor_event, mut rx_sensor_event) = mpsc::channel::<SensorEvent>(100);

    // GUI进程通道
    let (tx_gui_event, mut rx_gui_event) = mpsc::channel::<GuiEvent>(100);

    // 融合读数通道，聚合器只 try_send，满了就丢
    let (tx_reading, mut rx_reading) = mpsc::channel::<FusedReading>(100);

    // 启动GUI桥，接收开始/停止指令并推送读数
    let gui_bridge = Arc::new(GuiBridge::new(&config, tx_gui_event).await?);
    log::info!("Listening for GUI commands on {}", gui_bridge.local_addr()?);
    let gui_bridge_clone = gui_bridge.clone();
    tokio::spawn(async move {
        if let Err(e) = gui_bridge_clone.run().await {
            log::error!("GuiBridge error: {}", e);
        }
    });

    // 启动传感器桥，接收气压采样
    let sensor_bridge = SensorBridge::new(&config, tx_sensor_event).await?;
    log::info!("Listening for pressure events on {}", sensor_bridge.local_addr()?);
    tokio::spawn(async move {
        if let Err(e) = sensor_bridge.run().await {
            log::error!("SensorBridge error: {}", e);
        }
    });

    let aggregator = Arc::new(MeasurementAggregator::new(tx_reading));
    let platform = AlsaPlatform::new(
        config.raw_capture_device.clone(),
        config.standard_capture_device.clone(),
    );
    let mut controller = CoreController::new(&config, level_params, platform, aggregator);

    if config.auto_start && controller.start(config.microphone_permission) {
        notify(&gui_bridge, &NotificationContent::initializing()).await;
    }

    loop {
        tokio::select! {
            // 监听 Ctrl+C 信号
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down...");
                break;
            }

            Some(event) = rx_sensor_event.recv() => {
                controller.handle_sensor_event(event);
            }

            Some(event) = rx_gui_event.recv() => {
                log::info!("Received command from GUI: {:?}", event);
                if let Some(content) = controller.handle_gui_event(event) {
                    notify(&gui_bridge, &content).await;
                }
                if !controller.is_sensing() {
                    // 丢弃停止前已排队的读数
                    while rx_reading.try_recv().is_ok() {}
                }
            }

            Some(reading) = rx_reading.recv() => {
                if !controller.is_sensing() {
                    continue;
                }
                if let Err(e) = gui_bridge.send_reading(&reading).await {
                    log::debug!("Failed to send reading to GUI: {}", e);
                }
                if let Some(content) = controller.handle_reading(&reading) {
                    notify(&gui_bridge, &content).await;
                }
            }
        }
    }

    controller.stop();
    Ok(())
}

async fn notify(gui_bridge: &GuiBridge, content: &NotificationContent) {
    if let Err(e) = gui_bridge.send_notification(content).await {
        log::debug!("Failed to send notification to GUI: {}", e);
    }
}
