// VL01 Suntech - Integration Tests
//
// End-to-end checks of the translation core through its public API.
// The tests are organized into categories:
// 1. Decoding
// 2. Alarms
// 3. Encoding
// 4. Cache round-trips
// 5. Devices in parallel

use approx::assert_relative_eq;
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;
use vl01_suntech::*;

const DEVICE: &str = "868120301234567";

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
}

/// Fixed 18-byte layout: 2024-06-01 12:00:00, 8 sats, 90.0 / 45.0, 50 km/h
fn fixed_body(course_status: u16) -> Vec<u8> {
    let mut body = vec![24, 6, 1, 12, 0, 0, 0x08];
    body.extend_from_slice(&162_000_000u32.to_be_bytes());
    body.extend_from_slice(&81_000_000u32.to_be_bytes());
    body.push(50);
    body.extend_from_slice(&course_status.to_be_bytes());
    body
}

/// Trailer with a 1- or 2-byte MNC depending on bit 15 of `mcc`
fn with_trailer(mut body: Vec<u8>, mcc: u16, acc: u8, realtime: u8, mileage: u32) -> Vec<u8> {
    body.extend_from_slice(&mcc.to_be_bytes());
    if mcc & 0x8000 != 0 {
        body.extend_from_slice(&[0x00, 0x0B]);
    } else {
        body.push(0x0B);
    }
    body.extend_from_slice(&0x0000_1F40u32.to_be_bytes());
    body.extend_from_slice(&0x0000_0000_00BC_614Eu64.to_be_bytes());
    body.push(acc);
    body.push(0x00);
    body.push(realtime);
    body.extend_from_slice(&mileage.to_be_bytes());
    body
}

fn alarm_body(code: u8) -> Vec<u8> {
    let mut body = fixed_body(0x1C20);
    body[16] = 0x00;
    body[17] = code;
    body.extend_from_slice(&[0x00, 0x00, 0x00]);
    body
}

fn translator() -> Translator<MemoryStore, MemorySender> {
    Translator::new(MemoryStore::new(), MemorySender::new())
}

// ============================================================================
// Decoding Tests
// ============================================================================

#[test]
fn test_end_to_end_location_scenario() {
    let t = translator();
    let frame = InboundFrame::new(DEVICE, 1, FrameType::Location, fixed_body(0x1C20));
    let outcome = t.handle_at(&frame, at(12, 0, 10)).unwrap();

    let record = t.store().last_location("0301234567").unwrap().unwrap();
    assert_eq!(record.timestamp, at(12, 0, 0));
    assert_relative_eq!(record.latitude, 90.0);
    assert_relative_eq!(record.longitude, -45.0);
    assert_eq!(record.speed_kmh, 50);
    assert_eq!(record.direction, 32);

    let packet = outcome.packet().unwrap();
    assert_eq!(packet.field(6), Some("20240601"));
    assert_eq!(packet.field(7), Some("12:00:00"));
    assert_eq!(packet.field(8), Some("+90.000000"));
    assert_eq!(packet.field(9), Some("-45.000000"));
}

#[test]
fn test_decoding_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for _ in 0..500 {
        let mut body = vec![
            rng.gen_range(0..100),
            rng.gen_range(1..=12),
            rng.gen_range(1..=28),
            rng.gen_range(0..24),
            rng.gen_range(0..60),
            rng.gen_range(0..60),
        ];
        let len = rng.gen_range(12..40);
        body.extend((0..len).map(|_| rng.gen::<u8>()));

        let first = decode_location(&body).unwrap();
        let second = decode_location(&body).unwrap();
        assert_eq!(first, second);
        assert!(first.latitude.abs() <= u32::MAX as f64 / 1_800_000.0);
        assert!(first.direction <= 0x03FF);
        assert!(first.satellites.unwrap() <= 15);
    }
}

#[test]
fn test_hemisphere_configurations() {
    let north_east = decode_location(&fixed_body(0x0400)).unwrap();
    assert!(north_east.latitude >= 0.0 && north_east.longitude >= 0.0);

    let south_west = decode_location(&fixed_body(0x0800)).unwrap();
    assert!(south_west.latitude < 0.0 && south_west.longitude < 0.0);

    let north_west = decode_location(&fixed_body(0x0C00)).unwrap();
    assert!(north_west.latitude >= 0.0 && north_west.longitude < 0.0);
}

#[test]
fn test_no_fix_zero_coordinates_encode_as_positive() {
    let t = translator();
    let mut body = vec![24, 6, 1, 12, 0, 0, 0x00];
    body.extend_from_slice(&[0u8; 8]);
    body.push(0);
    body.extend_from_slice(&0x0000u16.to_be_bytes());

    let frame = InboundFrame::new(DEVICE, 1, FrameType::Location, body);
    let packet = t.handle_at(&frame, at(12, 0, 0)).unwrap().packet().cloned().unwrap();

    assert_eq!(packet.field(8), Some("+0.000000"));
    assert_eq!(packet.field(9), Some("+0.000000"));
    assert_eq!(packet.field(13), Some("0"));
}

#[test]
fn test_mnc_length_shifts_trailer() {
    let one = decode_location(&with_trailer(fixed_body(0x1C20), 0x02D4, 1, 0x00, 321)).unwrap();
    let two = decode_location(&with_trailer(fixed_body(0x1C20), 0x82D4, 1, 0x00, 321)).unwrap();

    assert_eq!(one.gps_odometer, Some(321));
    assert_eq!(two.gps_odometer, Some(321));
    assert_eq!(one.status_bits, Some(0b11));
    assert_eq!(two.status_bits, Some(0b11));
    assert_eq!(one.cell.unwrap().cell_id, 12_345_678);
    assert_eq!(two.cell.unwrap().cell_id, 12_345_678);
}

#[test]
fn test_replayed_location_sets_realtime_flag() {
    let t = translator();
    let body = with_trailer(fixed_body(0x1C20), 0x02D4, 0, 0x01, 99);
    let frame = InboundFrame::new(DEVICE, 1, FrameType::Location, body);
    let packet = t.handle_at(&frame, at(12, 0, 0)).unwrap().packet().cloned().unwrap();

    assert_eq!(packet.field(5), Some("0"));
    assert_eq!(packet.field(14), Some("00000000"));
    assert_eq!(packet.field(23), Some("99"));
}

#[test]
fn test_truncated_location_drops_without_send() {
    let t = translator();
    let body = fixed_body(0x1C20)[..10].to_vec();
    let frame = InboundFrame::new(DEVICE, 1, FrameType::Location, body);
    let outcome = t.handle_at(&frame, at(12, 0, 0)).unwrap();

    assert!(matches!(
        outcome.drop_reason(),
        Some(DropReason::Decode(DecodeError::BufferTooShort { .. }))
    ));
    assert_eq!(t.sender().pending(), 0);
}

// ============================================================================
// Alarm Tests
// ============================================================================

#[test]
fn test_overspeed_alarm_maps_to_alert_one() {
    let t = translator();
    let frame = InboundFrame::new(DEVICE, 9, FrameType::Alarm, alarm_body(0x06));
    let outcome = t.handle_at(&frame, at(12, 0, 30)).unwrap();

    assert_eq!(outcome.packet().unwrap().field(16), Some("1"));
    assert_eq!(t.sender().pending(), 1);
}

#[test]
fn test_unmapped_alarm_sends_nothing() {
    let t = translator();
    let frame = InboundFrame::new(DEVICE, 9, FrameType::Alarm, alarm_body(0x42));
    let outcome = t.handle_at(&frame, at(12, 0, 30)).unwrap();

    assert_eq!(outcome.drop_reason(), Some(&DropReason::UnmappedAlarmCode(0x42)));
    assert_eq!(t.sender().pending(), 0);
    assert_eq!(t.sender().metrics().packets_sent, 0);
}

#[test]
fn test_alarm_uses_cached_output_status() {
    let t = translator();
    t.handle_at(
        &InboundFrame::new(DEVICE, 1, FrameType::Heartbeat, vec![0x80]),
        at(12, 0, 0),
    )
    .unwrap();
    let frame = InboundFrame::new(DEVICE, 2, FrameType::Alarm, alarm_body(0xFE));
    let packet = t.handle_at(&frame, at(12, 0, 30)).unwrap().packet().cloned().unwrap();

    assert_eq!(packet.field(15), Some("00000001"));
    assert_eq!(packet.field(16), Some("33"));
}

#[test]
fn test_alarm_does_not_overwrite_cache() {
    let t = translator();
    t.handle_at(
        &InboundFrame::new(DEVICE, 1, FrameType::Location, fixed_body(0x1C20)),
        at(12, 0, 0),
    )
    .unwrap();
    let before = t.store().last_location("0301234567").unwrap();

    t.handle_at(
        &InboundFrame::new(DEVICE, 2, FrameType::Alarm, alarm_body(0x01)),
        at(12, 0, 30),
    )
    .unwrap();
    assert_eq!(t.store().last_location("0301234567").unwrap(), before);
}

// ============================================================================
// Encoding Tests
// ============================================================================

#[test]
fn test_device_id_normalization() {
    assert_eq!(normalize_device_id("imei:123-456-7890123"), "4567890123");
}

#[test]
fn test_serial_wraps_in_stt() {
    let t = translator();
    let frame = InboundFrame::new(DEVICE, 10_003, FrameType::Location, fixed_body(0x1C20));
    let outcome = t.handle_at(&frame, at(12, 0, 0)).unwrap();
    assert_eq!(outcome.packet().unwrap().field(18), Some("0003"));
}

#[test]
fn test_sent_bytes_match_packet_text() {
    let t = translator();
    let frame = InboundFrame::new(DEVICE, 77, FrameType::Location, fixed_body(0x1C20));
    let outcome = t.handle_at(&frame, at(12, 0, 0)).unwrap();

    let sent = t.sender().pop_sent().unwrap();
    assert_eq!(sent.bytes, outcome.packet().unwrap().to_text().into_bytes());
    assert!(sent.bytes.is_ascii());
}

#[test]
fn test_mode_flag_follows_heartbeat() {
    let t = translator();
    let location = InboundFrame::new(DEVICE, 1, FrameType::Location, fixed_body(0x1C20));

    let before = t.handle_at(&location, at(12, 0, 0)).unwrap();
    assert_eq!(before.packet().unwrap().field(16), Some("1"));

    t.handle_at(
        &InboundFrame::new(DEVICE, 2, FrameType::Heartbeat, vec![0x00]),
        at(12, 0, 0),
    )
    .unwrap();

    let after = t.handle_at(&location, at(12, 0, 0)).unwrap();
    assert_eq!(after.packet().unwrap().field(16), Some("0"));
    assert_eq!(after.packet().unwrap().field(15), Some("00000000"));
}

// ============================================================================
// Cache Round-trip Tests
// ============================================================================

#[test]
fn test_cached_record_reencodes_identically() {
    let encoder = SuntechEncoder::new();
    let record =
        decode_location(&with_trailer(fixed_body(0x1C20), 0x02D4, 1, 0x00, 4_321)).unwrap();
    let cached = LocationRecord::from_json(&record.to_json().unwrap()).unwrap();

    let stt_a = encoder.location_report(DEVICE, &record, 1, true, None);
    let stt_b = encoder.location_report(DEVICE, &cached, 1, true, None);
    for i in [8, 9, 23] {
        assert_eq!(stt_a.field(i), stt_b.field(i));
    }

    let res_a = encoder.command_response(DEVICE, RelayCommand::Engage, &record, None);
    let res_b = encoder.command_response(DEVICE, RelayCommand::Engage, &cached, None);
    for i in [9, 10, 15] {
        assert_eq!(res_a.field(i), res_b.field(i));
    }
    assert_eq!(res_b.field(15), Some("4321"));
}

#[test]
fn test_command_reply_uses_cached_location() {
    let t = translator();
    t.handle_at(
        &InboundFrame::new(DEVICE, 1, FrameType::Location, fixed_body(0x1C20)),
        at(12, 0, 0),
    )
    .unwrap();

    let mut body = vec![0x0B, 0x00, 0x00, 0x00, 0x01];
    body.extend_from_slice(b"RELAY 0");
    body.extend_from_slice(&[0x00, 0x02, 0x00, 0x00]);
    let frame = InboundFrame::new(DEVICE, 3, FrameType::CommandReply, body);
    let packet = t.handle_at(&frame, at(18, 45, 0)).unwrap().packet().cloned().unwrap();

    assert_eq!(
        packet.to_text(),
        "RES;0301234567;04;02;2024;06;01;18:45:00;0;90.000000;-45.000000;\
         50.00;32.00;8;0;0;0.0;00000000;00000000;1;0"
    );
}

// ============================================================================
// Parallel Device Tests
// ============================================================================

#[test]
fn test_devices_translate_independently_in_parallel() {
    let translator = Arc::new(translator());

    let handles: Vec<_> = (0..8u32)
        .map(|n| {
            let translator = Arc::clone(&translator);
            thread::spawn(move || {
                let device = format!("86812030{:07}", n);
                for serial in 0..20 {
                    let body = fixed_body(0x1C20);
                    let frame =
                        InboundFrame::new(device.clone(), serial, FrameType::Location, body);
                    assert!(translator.handle_at(&frame, at(12, 0, 0)).unwrap().is_sent());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(translator.store().device_count(), 8);
    assert_eq!(translator.sender().metrics().packets_sent, 160);
}
