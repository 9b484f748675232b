//! Integration tests for RFC 3261 transaction matching: key extraction
//! from real messages, the flag interactions, and table-lookup behavior.

use std::collections::HashMap;

use bytes::Bytes;
use sipmsg::prelude::*;

fn ctx() -> MessageContext {
    MessageContext::new()
}

fn request(method: &str, branch: &str, port: u16, extra: &str) -> Bytes {
    Bytes::from(format!(
        "{method} sip:bob@biloxi.com SIP/2.0\r\n\
         Via: SIP/2.0/UDP client.atlanta.com:{port};branch={branch}\r\n\
         To: Bob <sip:bob@biloxi.com>\r\n\
         From: Alice <sip:alice@atlanta.com>;tag=9fxced76sl\r\n\
         Call-ID: 3848276298220188511@atlanta.com\r\n\
         CSeq: 1 {method}\r\n\
         {extra}\r\n",
    ))
}

fn key_of(raw: &Bytes) -> TransactionKey {
    let (_, key) = SipMessage::parse_with_key(raw, &ctx()).unwrap();
    key
}

#[test]
fn same_branch_matches_regardless_of_other_headers() {
    let a = key_of(&request("INVITE", "z9hG4bKnashds8", 5060, ""));
    let b = key_of(&request(
        "INVITE",
        "z9hG4bKnashds8",
        5060,
        "Subject: completely different\r\nMax-Forwards: 70\r\n",
    ));
    assert_eq!(a, b);
    assert_eq!(a.hash_value(), b.hash_value());
}

#[test]
fn incoming_flag_folds_source_port_into_identity() {
    let mut a = key_of(&request("INVITE", "z9hG4bKnashds8", 5060, ""));
    let mut b = key_of(&request("INVITE", "z9hG4bKnashds8", 5061, ""));

    // Outgoing comparison ignores the source.
    assert_eq!(a, b);

    a.set_incoming(true);
    b.set_incoming(true);
    assert_ne!(a, b);
    assert_ne!(a.hash_value(), b.hash_value());
}

#[test]
fn cancel_matches_its_invite_only_in_lookup_mode() {
    let invite = key_of(&request("INVITE", "z9hG4bKnashds8", 5060, ""));
    let mut cancel = key_of(&request("CANCEL", "z9hG4bKnashds8", 5060, ""));

    // Method-sensitive comparison: CANCEL is not the INVITE.
    assert_ne!(cancel, invite);
    assert_ne!(invite, cancel);

    // The lookup probe finds its target.
    cancel.set_lookup(true);
    assert_eq!(cancel, invite);
    assert_eq!(invite, cancel);
    assert_eq!(cancel.hash_value(), invite.hash_value());
}

#[test]
fn lookup_probe_finds_the_server_transaction_in_a_table() {
    let mut table: HashMap<TransactionKey, &str> = HashMap::new();

    let mut invite = key_of(&request("INVITE", "z9hG4bKnashds8", 5060, ""));
    invite.set_incoming(true);
    invite.validate().unwrap();
    table.insert(invite, "invite-transaction");

    let mut probe = key_of(&request("CANCEL", "z9hG4bKnashds8", 5060, ""));
    probe.set_incoming(true);
    probe.set_lookup(true);
    probe.validate().unwrap();
    assert_eq!(table.get(&probe), Some(&"invite-transaction"));

    // A CANCEL from another source must not match.
    let mut stranger = key_of(&request("CANCEL", "z9hG4bKnashds8", 5099, ""));
    stranger.set_incoming(true);
    stranger.set_lookup(true);
    assert_eq!(table.get(&stranger), None);
}

#[test]
fn ack_and_prack_share_the_method_sensitivity_rule() {
    let invite = key_of(&request("INVITE", "z9hG4bKnashds8", 5060, ""));
    for method in ["ACK", "PRACK"] {
        let mut probe = key_of(&request(method, "z9hG4bKnashds8", 5060, ""));
        assert_ne!(probe, invite, "{method} must be method-sensitive outside lookup");
        probe.set_lookup(true);
        assert_eq!(probe, invite, "{method} must match its INVITE in lookup mode");
    }
}

#[test]
fn non_cookie_branch_is_treated_as_absent() {
    let old = key_of(&request("INVITE", "7b7w32", 5060, ""));
    assert_eq!(old.branch(), None);
    assert!(old.validate().is_err());

    // Two cookieless keys still compare branch-equal (both absent), so an
    // unvalidated key really would collide, which is why validate gates
    // table use.
    let other = key_of(&request("INVITE", "unrelated99", 5060, ""));
    assert_eq!(old, other);
}

#[test]
fn message_without_via_fails_validation() {
    let raw = Bytes::from_static(
        b"INVITE sip:bob@biloxi.com SIP/2.0\r\n\
          To: Bob <sip:bob@biloxi.com>\r\n\
          CSeq: 1 INVITE\r\n\
          \r\n",
    );
    let key = key_of(&raw);
    assert!(matches!(key.validate(), Err(Error::InvalidTransactionKey(_))));
}

#[test]
fn message_without_cseq_fails_validation() {
    let raw = Bytes::from_static(
        b"INVITE sip:bob@biloxi.com SIP/2.0\r\n\
          Via: SIP/2.0/UDP h;branch=z9hG4bK1\r\n\
          \r\n",
    );
    let key = key_of(&raw);
    assert!(key.validate().is_err());
}

#[test]
fn only_the_top_via_feeds_the_key() {
    let raw = Bytes::from_static(
        b"INVITE sip:bob@biloxi.com SIP/2.0\r\n\
          Via: SIP/2.0/UDP proxy.example.com:5062;branch=z9hG4bKtop\r\n\
          Via: SIP/2.0/UDP origin.example.com:5060;branch=z9hG4bKbelow\r\n\
          CSeq: 1 INVITE\r\n\
          \r\n",
    );
    let key = key_of(&raw);
    assert_eq!(key.branch(), Some(&b"z9hG4bKtop"[..]));
    assert_eq!(key.source_host(), Some(&b"proxy.example.com"[..]));
    assert_eq!(key.source_port(), Some(5062));
}

#[test]
fn to_tag_is_captured_for_diagnostics() {
    let raw = Bytes::from_static(
        b"BYE sip:bob@biloxi.com SIP/2.0\r\n\
          Via: SIP/2.0/UDP h;branch=z9hG4bKbye1\r\n\
          To: Bob <sip:bob@biloxi.com>;tag=a6c85cf\r\n\
          CSeq: 2 BYE\r\n\
          \r\n",
    );
    let key = key_of(&raw);
    assert_eq!(key.to_tag(), Some(&b"a6c85cf"[..]));
    let dump = key.to_string();
    assert!(dump.contains("to-tag=a6c85cf"), "{dump}");
}

#[test]
fn key_derived_later_equals_key_from_the_initial_pass() {
    let raw = request("INVITE", "z9hG4bKnashds8", 5060, "");
    let (msg, scanned) = SipMessage::parse_with_key(&raw, &ctx()).unwrap();
    let derived = msg.transaction_key().unwrap();
    assert_eq!(scanned, derived);
    assert_eq!(scanned.hash_value(), derived.hash_value());
    assert_eq!(scanned.to_tag(), derived.to_tag());
}
