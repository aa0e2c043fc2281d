use crate::aggregator::FusedReading;
use crate::config::Config;
use crate::notification::NotificationContent;
use crate::protocol::{ControlMessage, DisplayMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum GuiEvent {
    Command(ControlMessage),
}

pub struct GuiBridge {
    socket: Arc<UdpSocket>,
    target_addr: String,
    tx: mpsc::Sender<GuiEvent>,
    buffer_size: usize,
}

// GUI进程和Core进程通过本地UDP通信，端口在配置中指定
impl GuiBridge {
    pub async fn new(config: &Config, tx: mpsc::Sender<GuiEvent>) -> anyhow::Result<Self> {
        Self::bind(
            &format!("{}:{}", config.gui_local_ip, config.gui_local_port),
            format!("{}:{}", config.gui_remote_ip, config.gui_remote_port),
            tx,
            config.gui_buffer_size,
        )
        .await
    }

    pub async fn bind(
        local_addr: &str,
        target_addr: String,
        tx: mpsc::Sender<GuiEvent>,
        buffer_size: usize,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(local_addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
            target_addr,
            tx,
            buffer_size,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let (len, _) = self.socket.recv_from(&mut buf).await?;
            if len == 0 {
                continue;
            }
            match serde_json::from_slice::<ControlMessage>(&buf[..len]) {
                Ok(cmd) => {
                    if let Err(e) = self.tx.send(GuiEvent::Command(cmd)).await {
                        log::warn!("Failed to send GUI event: {}", e);
                        break;
                    }
                }
                Err(e) => log::warn!("Ignoring unknown GUI message: {}", e),
            }
        }
        Ok(())
    }

    pub async fn send_message(&self, msg: &str) -> anyhow::Result<()> {
        self.socket
            .send_to(msg.as_bytes(), &self.target_addr)
            .await?;
        Ok(())
    }

    pub async fn send_reading(&self, reading: &FusedReading) -> anyhow::Result<()> {
        let msg = serde_json::to_string(&DisplayMessage::Reading(reading))?;
        self.send_message(&msg).await
    }

    pub async fn send_notification(&self, content: &NotificationContent) -> anyhow::Result<()> {
        let msg = serde_json::to_string(&DisplayMessage::Notification(content))?;
        self.send_message(&msg).await
    }
}
