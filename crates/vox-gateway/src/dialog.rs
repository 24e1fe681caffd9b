//! In-dialog and dialog-establishing SIP request handling: INVITE, ACK,
//! BYE, NOTIFY, OPTIONS (spec §4.A `HandleInvite`/`HandleAck/Bye/Notify`).

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use tracing::{info, warn};
use vox_core::ports::{rtp_port, DEFAULT_SLOT_COUNT, DEFAULT_SLOT_SIZE};
use vox_core::{CallId, LineId};
use vox_sip::message::{Headers, Message, Method};
use vox_sip::number::normalize_caller_number;
use vox_sip::sdp::build_answer_sdp;
use vox_shm::{inbound_channel_name, outbound_channel_name, unlink, ShmRing};

use crate::call::{CallSession, CallState};
use crate::control_client;
use crate::rtp_io::{bind_rtp_socket, rtp_receive_loop, rtp_send_loop};
use crate::sip_socket::SipSocket;
use crate::state::GatewayState;

pub async fn handle_request(socket: Arc<SipSocket>, state: Arc<GatewayState>, msg: Message, src: SocketAddr) {
    let Message::Request { method, .. } = &msg else {
        return;
    };
    match method.clone() {
        Method::Invite => handle_invite(socket, state, msg, src).await,
        Method::Ack => handle_ack(state, msg).await,
        Method::Bye => handle_bye(socket, state, msg, src).await,
        Method::Notify => handle_notify(socket, state, msg, src).await,
        Method::Options => handle_options(socket, state, msg, src).await,
        other => {
            warn!(method = %other, "ignoring unsupported request method");
        }
    }
}

fn response_for(request: &Message, status: u16, reason: &str, body: Vec<u8>) -> Message {
    let mut headers = Headers::new();
    let req_headers = request.headers();
    for name in ["Via", "From", "To", "Call-ID"] {
        for value in req_headers.get_all(name) {
            headers.push(name, value);
        }
    }
    // The CSeq method must echo the request being answered, not a fixed
    // method (spec §9 open question).
    if let Some(cseq) = req_headers.get("CSeq") {
        headers.push("CSeq", cseq);
    }
    Message::Response {
        status,
        reason: reason.to_string(),
        headers,
        body,
    }
}

fn pick_line(state: &GatewayState, to_header: &str) -> Option<LineId> {
    let wanted = normalize_caller_number(to_header);
    if let Some(entry) = state.lines.iter().find(|e| e.value().config.username == wanted) {
        return Some(*entry.key());
    }
    state
        .lines
        .iter()
        .find(|e| e.value().config.enabled)
        .map(|e| *e.key())
}

async fn handle_invite(socket: Arc<SipSocket>, state: Arc<GatewayState>, msg: Message, src: SocketAddr) {
    let Some(sip_call_id) = msg.call_id().map(str::to_string) else {
        return;
    };
    let Some(from) = msg.headers().get("From").map(str::to_string) else {
        return;
    };
    let to = msg.headers().get("To").unwrap_or_default().to_string();

    let Some(line_id) = pick_line(&state, &to) else {
        warn!(%sip_call_id, "no SIP line configured to answer this INVITE");
        return;
    };

    let ringing = response_for(&msg, 180, "Ringing", Vec::new());
    socket.send_to(&ringing, src).await;

    let number = normalize_caller_number(&from);
    let caller_id = match state.store.get_or_create_caller(&number) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "failed recording caller");
            return;
        }
    };
    let db_row_id = match state.store.create_call(&sip_call_id, caller_id, line_id.0, &number) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "failed recording call");
            return;
        }
    };
    let call_id = CallId(db_row_id as u32);
    let port = rtp_port(line_id);

    let inbound_name = inbound_channel_name(call_id.0);
    let outbound_name = outbound_channel_name(call_id.0);

    let mut inbound_ring = match ShmRing::create_or_open(&inbound_name, call_id.0, DEFAULT_SLOT_SIZE, DEFAULT_SLOT_COUNT, true) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "failed opening inbound shm ring");
            return;
        }
    };
    inbound_ring.set_role_producer(true);
    let mut outbound_ring = match ShmRing::create_or_open(&outbound_name, call_id.0, DEFAULT_SLOT_SIZE, DEFAULT_SLOT_COUNT, true) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "failed opening outbound shm ring");
            return;
        }
    };
    outbound_ring.set_role_consumer(true);
    let inbound_ring = Arc::new(inbound_ring);
    let outbound_ring = Arc::new(outbound_ring);

    let mut session = CallSession::new(call_id, line_id, sip_call_id.clone(), src, db_row_id, port);
    session.transition(CallState::Establishing);

    let rtp_socket = match bind_rtp_socket(port).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, port, "failed binding RTP socket");
            return;
        }
    };

    let session = Arc::new(Mutex::new(session));

    let recv_task = tokio::spawn(rtp_receive_loop(rtp_socket.clone(), session.clone(), inbound_ring));
    let send_task = tokio::spawn(rtp_send_loop(rtp_socket, session.clone(), outbound_ring, call_id));
    session.lock().tasks.push(recv_task);
    session.lock().tasks.push(send_task);

    state.calls.insert(call_id, session);
    state.sip_call_id_index.insert(sip_call_id.clone(), call_id);

    control_client::send_activate(&state.inbound_control_path, call_id.0).await;
    control_client::send_activate(&state.outbound_control_path, call_id.0).await;

    let sdp = build_answer_sdp(&state.local_ip, port);
    let mut ok = response_for(&msg, 200, "OK", sdp.into_bytes());
    let mut rng = rand::thread_rng();
    let to_tag: u64 = rng.gen();
    if let Message::Response { headers, .. } = &mut ok {
        headers.set("To", format!("{to};tag={to_tag:x}"));
        headers.push("Content-Type", "application/sdp");
    }
    socket.send_to(&ok, src).await;

    info!(call_id = call_id.0, line = line_id.0, %number, "call established, awaiting ACK");
}

async fn handle_ack(state: Arc<GatewayState>, msg: Message) {
    let Some(sip_call_id) = msg.call_id() else {
        return;
    };
    if let Some(session) = state.find_call_by_sip_id(sip_call_id) {
        let mut guard = session.lock();
        guard.transition(CallState::Active);
        info!(call_id = guard.call_id.0, "call active");
    }
}

async fn handle_bye(socket: Arc<SipSocket>, state: Arc<GatewayState>, msg: Message, src: SocketAddr) {
    let Some(sip_call_id) = msg.call_id().map(str::to_string) else {
        return;
    };
    let ok = response_for(&msg, 200, "OK", Vec::new());
    socket.send_to(&ok, src).await;

    let Some(session) = state.find_call_by_sip_id(&sip_call_id) else {
        return;
    };

    control_client::send_deactivate(&state.inbound_control_path).await;
    control_client::send_deactivate(&state.outbound_control_path).await;

    let (call_id, db_row_id, tasks) = {
        let mut guard = session.lock();
        guard.transition(CallState::Terminating);
        let tasks = std::mem::take(&mut guard.tasks);
        (guard.call_id, guard.db_row_id, tasks)
    };
    for task in tasks {
        task.abort();
    }

    if let Err(e) = state.store.end_call(db_row_id) {
        warn!(error = %e, "failed marking call ended");
    }
    unlink(&inbound_channel_name(call_id.0));
    unlink(&outbound_channel_name(call_id.0));
    state.remove_call(call_id, &sip_call_id);
    info!(call_id = call_id.0, "call terminated");
}

async fn handle_notify(socket: Arc<SipSocket>, _state: Arc<GatewayState>, msg: Message, src: SocketAddr) {
    let ok = response_for(&msg, 200, "OK", Vec::new());
    socket.send_to(&ok, src).await;
}

/// OPTIONS is answered with a capability listing but otherwise has no
/// side effects (original_source/ `sip-client-main.cpp` keepalive pings;
/// supplemented here since the spec is silent on it but the PBX uses it
/// as a liveness probe).
async fn handle_options(socket: Arc<SipSocket>, _state: Arc<GatewayState>, msg: Message, src: SocketAddr) {
    let mut ok = response_for(&msg, 200, "OK", Vec::new());
    if let Message::Response { headers, .. } = &mut ok {
        headers.push("Allow", "INVITE, ACK, BYE, CANCEL, OPTIONS, NOTIFY");
        headers.push("Accept", "application/sdp");
    }
    socket.send_to(&ok, src).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bye_request() -> Message {
        let mut headers = Headers::new();
        headers
            .push("Via", "SIP/2.0/UDP 10.0.0.5:5060")
            .push("From", "<sip:+15551234567@pbx>;tag=1")
            .push("To", "<sip:1001@local>;tag=2")
            .push("Call-ID", "A@pbx")
            .push("CSeq", "2 BYE");
        Message::Request {
            method: Method::Bye,
            uri: "sip:1001@local".into(),
            headers,
            body: Vec::new(),
        }
    }

    #[test]
    fn response_cseq_echoes_the_request_method() {
        let request = bye_request();
        let response = response_for(&request, 200, "OK", Vec::new());
        assert_eq!(response.cseq(), Some((2, Method::Bye)));
    }

    #[test]
    fn picks_line_matching_to_header_username() {
        use vox_core::config::SipLineConfig;

        let store = std::sync::Arc::new(vox_store::Store::open_in_memory().unwrap());
        let lines = vec![
            SipLineConfig {
                line_id: 1,
                username: "1001".into(),
                password: "a".into(),
                server_host: "pbx".into(),
                server_port: 5060,
                enabled: true,
            },
            SipLineConfig {
                line_id: 2,
                username: "1002".into(),
                password: "b".into(),
                server_host: "pbx".into(),
                server_port: 5060,
                enabled: true,
            },
        ];
        let state = GatewayState::new(
            "127.0.0.1".into(),
            store,
            lines,
            "/tmp/in.sock".into(),
            "/tmp/out.sock".into(),
        );
        let picked = pick_line(&state, "<sip:1002@local>");
        assert_eq!(picked, Some(LineId(2)));
    }
}
