//! The SIP/RTP gateway: the only process that talks UDP SIP to the PBX
//! and owns every per-call RTP socket (spec §4.A).

mod call;
mod control_client;
mod dialog;
mod register;
mod rtp_io;
mod sip_socket;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use vox_core::config::Config;
use vox_core::{telemetry, LineId};
use vox_store::Store;

use sip_socket::SipSocket;
use state::GatewayState;

#[derive(Parser, Debug)]
#[command(name = "vox-gateway", about = "SIP/RTP gateway process")]
struct Args {
    #[arg(long, default_value = "voxbridge.toml")]
    config: String,

    #[arg(long, default_value = "127.0.0.1")]
    local_ip: String,

    #[arg(long, default_value = "0.0.0.0:5060")]
    listen: String,

    #[arg(long, default_value = "/tmp/voxbridge-inbound.sock")]
    inbound_control: String,

    #[arg(long, default_value = "/tmp/voxbridge-outbound.sock")]
    outbound_control: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info");
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    let store = Arc::new(Store::open(&config.store.db_path)?);

    for line in &config.gateway.lines {
        store.create_sip_line(
            line.line_id,
            &line.username,
            &line.password,
            &line.server_host,
            line.server_port,
        )?;
    }

    let state = Arc::new(GatewayState::new(
        args.local_ip.clone(),
        store,
        config.gateway.lines.clone(),
        args.inbound_control.clone(),
        args.outbound_control.clone(),
    ));

    let listen_addr = args.listen.parse()?;
    let socket = SipSocket::bind(listen_addr).await?;
    tracing::info!(local = %listen_addr, "SIP socket bound");

    let reregister_interval = Duration::from_secs(config.gateway.register_interval_secs);
    for entry in state.lines.iter() {
        let line_id: LineId = *entry.key();
        let socket = socket.clone();
        let state = state.clone();
        tokio::spawn(async move {
            register::register_loop(socket, state, line_id, reregister_interval).await;
        });
    }

    let recv_state = state.clone();
    let recv_socket = socket.clone();
    let recv_handle = tokio::spawn(async move {
        loop {
            if !recv_socket.running.load(std::sync::atomic::Ordering::SeqCst) {
                return;
            }
            let Some((msg, src)) = recv_socket.recv_one().await else {
                continue;
            };
            match &msg {
                vox_sip::Message::Response { .. } => {
                    if let Some(sip_call_id) = msg.call_id() {
                        if let Some((_, method)) = msg.cseq() {
                            if method == vox_sip::message::Method::Register {
                                if let Some(line_id) = recv_state.find_line_by_register_call_id(sip_call_id) {
                                    recv_socket.complete_register(line_id, msg);
                                }
                                continue;
                            }
                        }
                    }
                }
                vox_sip::Message::Request { .. } => {
                    dialog::handle_request(recv_socket.clone(), recv_state.clone(), msg, src).await;
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    socket.stop();
    recv_handle.abort();
    Ok(())
}
