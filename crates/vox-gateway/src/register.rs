//! REGISTER / digest-challenge / re-REGISTER flow (spec §4.A
//! "RegisterLine").

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};
use vox_core::LineId;
use vox_sip::digest::{build_authorization_header, parse_challenge};
use vox_sip::message::{Headers, Message, Method};
use vox_store::LineStatus;

use crate::sip_socket::SipSocket;
use crate::state::GatewayState;

fn random_token(rng: &mut impl Rng) -> String {
    let n: u64 = rng.gen();
    format!("{n:016x}")
}

/// Run REGISTER once for a line, following one digest challenge if
/// offered. Returns `true` on a final `200 OK`.
async fn register_once(socket: &SipSocket, state: &GatewayState, line_id: LineId) -> bool {
    let Some(runtime) = state.lines.get(&line_id).map(|e| e.value().clone()) else {
        return false;
    };
    let cfg = &runtime.config;
    let dest = format!("{}:{}", cfg.server_host, cfg.server_port);
    let resolved = tokio::net::lookup_host(&dest).await.ok().and_then(|mut it| it.next());
    let Some(dest_addr) = resolved else {
        warn!(line = cfg.line_id, %dest, "cannot resolve SIP server");
        return false;
    };

    let uri = format!("sip:{}", cfg.server_host);
    let mut rng = rand::thread_rng();

    {
        let mut call_id_slot = runtime.register_call_id.lock();
        if call_id_slot.is_empty() {
            *call_id_slot = format!("{}@voxbridge", random_token(&mut rng));
        }
    }
    let call_id = runtime.register_call_id.lock().clone();
    let branch = format!("z9hG4bK{}", random_token(&mut rng));
    let contact_port = socket.local_port();

    let send_register = |authorization: Option<String>| -> Message {
        let cseq = runtime.next_cseq();
        let mut headers = Headers::new();
        headers
            .push("Via", format!("SIP/2.0/UDP {}:{};branch={}", state.local_ip, contact_port, branch))
            .push("From", format!("<sip:{}@{}>;tag={}", cfg.username, cfg.server_host, random_token(&mut rng)))
            .push("To", format!("<sip:{}@{}>", cfg.username, cfg.server_host))
            .push("Call-ID", call_id.clone())
            .push("CSeq", format!("{cseq} REGISTER"))
            .push("Contact", format!("<sip:{}@{}:{}>", cfg.username, state.local_ip, contact_port))
            .push("Expires", "1800");
        if let Some(auth) = authorization {
            headers.push("Authorization", auth);
        }
        Message::Request {
            method: Method::Register,
            uri: uri.clone(),
            headers,
            body: Vec::new(),
        }
    };

    let first = send_register(None);
    socket.send_to(&first, dest_addr).await;

    let rx = socket.await_register_response(line_id);
    let resp = match tokio::time::timeout(SipSocket::REGISTER_WAIT, rx).await {
        Ok(Ok(msg)) => msg,
        _ => {
            warn!(line = cfg.line_id, "REGISTER timed out waiting for a response");
            return false;
        }
    };

    let status = match &resp {
        Message::Response { status, .. } => *status,
        _ => return false,
    };

    if status == 200 {
        return true;
    }

    if status != 401 && status != 407 {
        warn!(line = cfg.line_id, status, "REGISTER rejected");
        return false;
    }

    let header_name = if status == 401 {
        "WWW-Authenticate"
    } else {
        "Proxy-Authenticate"
    };
    let Some(challenge_header) = resp.headers().get(header_name) else {
        warn!(line = cfg.line_id, "challenge response missing auth header");
        return false;
    };
    let challenge = match parse_challenge(challenge_header) {
        Ok(c) => c,
        Err(e) => {
            warn!(line = cfg.line_id, error = %e, "unparsable digest challenge");
            return false;
        }
    };

    let nc = "00000001";
    let cnonce = random_token(&mut rng);
    let authorization = build_authorization_header(
        &cfg.username,
        &cfg.password,
        &challenge,
        "REGISTER",
        &uri,
        nc,
        &cnonce,
    );

    let retry = send_register(Some(authorization));
    socket.send_to(&retry, dest_addr).await;

    let rx = socket.await_register_response(line_id);
    let resp = match tokio::time::timeout(SipSocket::REGISTER_WAIT, rx).await {
        Ok(Ok(msg)) => msg,
        _ => {
            warn!(line = cfg.line_id, "authenticated REGISTER timed out");
            return false;
        }
    };

    matches!(resp, Message::Response { status: 200, .. })
}

/// Drive a line's REGISTER lifecycle forever: attempt, react to the
/// result, sleep, repeat. Two consecutive authentication failures park the
/// line in `error` until an admin re-enables it (spec §4.A "Failure
/// semantics").
pub async fn register_loop(
    socket: Arc<SipSocket>,
    state: Arc<GatewayState>,
    line_id: LineId,
    reregister_interval: Duration,
) {
    let Some(runtime) = state.lines.get(&line_id).map(|e| e.value().clone()) else {
        return;
    };

    loop {
        if !socket.running.load(Ordering::SeqCst) {
            return;
        }
        if !runtime.config.enabled {
            tokio::time::sleep(Duration::from_secs(30)).await;
            continue;
        }

        *runtime.status.lock() = LineStatus::Connecting;
        let _ = state.store.update_sip_line_status(line_id.0, LineStatus::Connecting);

        let ok = register_once(&socket, &state, line_id).await;
        if ok {
            info!(line = line_id.0, "SIP line registered");
            *runtime.status.lock() = LineStatus::Connected;
            let _ = state.store.update_sip_line_status(line_id.0, LineStatus::Connected);
            runtime.auth_failures.store(0, Ordering::SeqCst);
            tokio::time::sleep(reregister_interval).await;
        } else {
            let failures = runtime.auth_failures.fetch_add(1, Ordering::SeqCst) + 1;
            if failures >= 2 {
                error!(line = line_id.0, "REGISTER failed twice, marking line error");
                *runtime.status.lock() = LineStatus::Error;
                let _ = state.store.update_sip_line_status(line_id.0, LineStatus::Error);
                return;
            }
            *runtime.status.lock() = LineStatus::Disconnected;
            let _ = state.store.update_sip_line_status(line_id.0, LineStatus::Disconnected);
            let backoff = Duration::from_secs(5 * failures as u64);
            tokio::time::sleep(backoff).await;
        }
    }
}
