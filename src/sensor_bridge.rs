use crate::config::Config;
use crate::protocol::SensorMessage;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    Pressure(f32),
}

// 气压传感器进程通过本地UDP推送采样，端口在配置中指定
pub struct SensorBridge {
    socket: Arc<UdpSocket>,
    tx: mpsc::Sender<SensorEvent>,
    buffer_size: usize,
}

impl SensorBridge {
    pub async fn new(config: &Config, tx: mpsc::Sender<SensorEvent>) -> anyhow::Result<Self> {
        Self::bind(
            &format!("{}:{}", config.sensor_local_ip, config.sensor_local_port),
            tx,
            config.sensor_buffer_size,
        )
        .await
    }

    pub async fn bind(
        addr: &str,
        tx: mpsc::Sender<SensorEvent>,
        buffer_size: usize,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
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
            let event = match serde_json::from_slice::<SensorMessage>(&buf[..len]) {
                Ok(SensorMessage::Pressure { pressure_hpa }) => SensorEvent::Pressure(pressure_hpa),
                Err(e) => {
                    log::warn!("Ignoring malformed sensor datagram: {}", e);
                    continue;
                }
            };
            // 传感器事件路径不阻塞：通道满时丢弃本次采样
            if let Err(e) = self.tx.try_send(event) {
                if matches!(e, mpsc::error::TrySendError::Closed(_)) {
                    log::warn!("Sensor event receiver dropped");
                    break;
                }
                log::debug!("Sensor event dropped: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_pressure_and_skips_garbage() {
        let (tx, mut rx) = mpsc::channel(4);
        let bridge = SensorBridge::bind("127.0.0.1:0", tx, 256).await.unwrap();
        let addr = bridge.local_addr().unwrap();
        tokio::spawn(async move { bridge.run().await });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"not json", addr).await.unwrap();
        sender
            .send_to(br#"{"type":"pressure","pressure_hpa":987.5}"#, addr)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event, SensorEvent::Pressure(987.5));
    }
}
