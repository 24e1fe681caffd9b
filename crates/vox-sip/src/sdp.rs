//! Just enough SDP to answer an INVITE: one audio media line offering
//! PCMU and the (unused) telephone-event payload type (spec §4.A).

/// Build the SDP body placed in the `200 OK` answering an INVITE.
pub fn build_answer_sdp(local_ip: &str, rtp_port: u16) -> String {
    format!(
        "v=0\r\n\
         o=- 0 0 IN IP4 {local_ip}\r\n\
         s=voxbridge\r\n\
         c=IN IP4 {local_ip}\r\n\
         t=0 0\r\n\
         m=audio {rtp_port} RTP/AVP 0 101\r\n\
         a=rtpmap:0 PCMU/8000\r\n\
         a=rtpmap:101 telephone-event/8000\r\n\
         a=sendrecv\r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_sdp_advertises_pcmu_and_sendrecv() {
        let sdp = build_answer_sdp("192.0.2.10", 10001);
        assert!(sdp.contains("m=audio 10001 RTP/AVP 0 101"));
        assert!(sdp.contains("a=rtpmap:0 PCMU/8000"));
        assert!(sdp.contains("a=rtpmap:101 telephone-event/8000"));
        assert!(sdp.contains("a=sendrecv"));
    }
}
