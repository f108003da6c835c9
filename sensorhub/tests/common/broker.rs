#![allow(dead_code)]

//! Minimal MQTT 3.1.1 broker over loopback TCP that records what clients send.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];
const PINGRESP: [u8; 2] = [0xD0, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Answers every connection.
    Serve,
    /// Closes the first connection after its first publish, then serves.
    DropFirst,
    /// Closes the first connection after its first publish and stops
    /// listening.
    Outage,
    /// Accepts connections but never sends CONNACK.
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Will {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub retain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub retain: bool,
    pub pkid: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect { client_id: String, will: Option<Will> },
    Publish(Publish),
    PingReq,
    Disconnect,
    Other(u8),
}

#[derive(Debug)]
pub struct Received {
    pub connection: usize,
    pub packet: Packet,
}

pub struct FakeBroker {
    pub address: String,
    received: mpsc::UnboundedReceiver<Received>,
}

impl FakeBroker {
    pub async fn start(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("tcp://{}", listener.local_addr().unwrap());
        let (sender, received) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut connection = 0;
            while let Ok((stream, _)) = listener.accept().await {
                let serving = tokio::spawn(serve(stream, connection, behaviour, sender.clone()));
                if behaviour == Behaviour::Outage {
                    let _ = serving.await;
                    break;
                }
                connection += 1;
            }
        });

        Self { address, received }
    }

    pub async fn next(&mut self) -> Received {
        tokio::time::timeout(Duration::from_secs(20), self.received.recv())
            .await
            .expect("broker received nothing in time")
            .expect("broker stopped")
    }

    /// Skips pings and returns the next publish.
    pub async fn next_publish(&mut self) -> (usize, Publish) {
        loop {
            let received = self.next().await;
            if let Packet::Publish(publish) = received.packet {
                return (received.connection, publish);
            }
        }
    }
}

async fn serve(mut stream: TcpStream, connection: usize, behaviour: Behaviour, sender: mpsc::UnboundedSender<Received>) {
    let closes_after_publish = connection == 0 && matches!(behaviour, Behaviour::DropFirst | Behaviour::Outage);

    while let Ok(packet) = read_packet(&mut stream).await {
        let reply = match &packet {
            Packet::Connect { .. } if behaviour != Behaviour::Silent => Some(CONNACK.to_vec()),
            Packet::Publish(publish) if publish.qos > 0 => {
                let [high, low] = publish.pkid.to_be_bytes();
                Some(vec![0x40, 0x02, high, low])
            }
            Packet::PingReq => Some(PINGRESP.to_vec()),
            _ => None,
        };
        if let Some(reply) = reply {
            if stream.write_all(&reply).await.is_err() {
                return;
            }
        }

        let done = matches!(packet, Packet::Disconnect) || (closes_after_publish && matches!(packet, Packet::Publish(_)));
        let _ = sender.send(Received { connection, packet });
        if done {
            return;
        }
    }
}

async fn read_packet(stream: &mut TcpStream) -> io::Result<Packet> {
    let header = stream.read_u8().await?;

    let mut length = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await?;
        length |= usize::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let mut body = vec![0; length];
    stream.read_exact(&mut body).await?;

    Ok(decode(header, &body))
}

struct Body<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl Body<'_> {
    fn u8(&mut self) -> u8 {
        self.at += 1;
        self.bytes[self.at - 1]
    }

    fn u16(&mut self) -> u16 {
        u16::from_be_bytes([self.u8(), self.u8()])
    }

    fn bytes(&mut self) -> Vec<u8> {
        let len = usize::from(self.u16());
        self.at += len;
        self.bytes[self.at - len..self.at].to_vec()
    }

    fn string(&mut self) -> String {
        String::from_utf8(self.bytes()).unwrap()
    }

    fn rest(&mut self) -> Vec<u8> {
        let rest = self.bytes[self.at..].to_vec();
        self.at = self.bytes.len();
        rest
    }
}

fn decode(header: u8, bytes: &[u8]) -> Packet {
    let mut body = Body { bytes, at: 0 };

    match header >> 4 {
        1 => {
            let _protocol = body.string();
            let _level = body.u8();
            let flags = body.u8();
            let _keep_alive = body.u16();
            let client_id = body.string();
            let will = (flags & 0x04 != 0).then(|| Will {
                topic: body.string(),
                payload: body.bytes(),
                qos: (flags >> 3) & 0x03,
                retain: flags & 0x20 != 0,
            });
            Packet::Connect { client_id, will }
        }
        3 => {
            let qos = (header >> 1) & 0x03;
            let topic = body.string();
            let pkid = if qos > 0 { body.u16() } else { 0 };
            Packet::Publish(Publish {
                topic,
                payload: body.rest(),
                qos,
                retain: header & 0x01 != 0,
                pkid,
            })
        }
        12 => Packet::PingReq,
        14 => Packet::Disconnect,
        other => Packet::Other(other),
    }
}
