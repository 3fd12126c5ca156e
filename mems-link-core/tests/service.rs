//! Main-loop tests: bytes in through the DMA ring, replies out of the UART

use heapless::Vec;
use mems_link_core::{Dispatcher, LinkConfig, Serviced};
use mems_link_hal::{DmaRing, TxReady, UartError, UartTx};
use mems_link_protocol::commands::{ADDR_USB, CMD_PING, CMD_START_DATA_STREAMING};
use mems_link_protocol::frame::{decode, encode_to_vec};
use mems_link_protocol::transport::Link;
use mems_link_protocol::{Msg, EOF};
use proptest::prelude::*;

#[derive(Default)]
struct CaptureUart {
    sent: Vec<u8, 512>,
}

impl UartTx for CaptureUart {
    fn write_blocking(&mut self, data: &[u8], _timeout_ms: u32) -> Result<(), UartError> {
        self.sent.extend_from_slice(data).map_err(|_| UartError::Other)
    }
}

fn frame(bytes: &[u8]) -> Vec<u8, 64> {
    let msg: Msg = Msg::from_slice(bytes).unwrap();
    encode_to_vec(&msg).unwrap()
}

#[test]
fn ping_round_trip() {
    let mut ring = DmaRing::<128>::new();
    let (mut writer, reader) = ring.split();
    let ready = TxReady::new();
    let mut link: Link<_, _> = Link::new(reader, CaptureUart::default(), &ready);
    let mut dispatcher: Dispatcher<()> = Dispatcher::new((), LinkConfig::default());
    link.start();

    assert_eq!(dispatcher.service(&mut link), Ok(Serviced::Idle));

    writer.write(&[0x32, 0x01, 0x01, 0xCC, EOF]);
    assert_eq!(dispatcher.service(&mut link), Ok(Serviced::Replied(5)));
    assert_eq!(link.tx().sent.as_slice(), &[0x01, 0x32, 0x81, 0x4C, EOF]);
}

#[test]
fn corrupt_frame_then_ping() {
    let mut ring = DmaRing::<128>::new();
    let (mut writer, reader) = ring.split();
    let ready = TxReady::new();
    let mut link: Link<_, _> = Link::new(reader, CaptureUart::default(), &ready);
    let mut dispatcher: Dispatcher<()> = Dispatcher::new((), LinkConfig::default());
    link.start();

    writer.write(&[0x32, 0x01, 0x01, 0x00, EOF]);
    writer.write(&frame(&[0x32, ADDR_USB, CMD_PING]));

    assert_eq!(dispatcher.service(&mut link), Ok(Serviced::Idle));
    assert_eq!(dispatcher.service(&mut link), Ok(Serviced::Replied(5)));

    let (reply, _) = decode::<256>(&link.tx().sent).unwrap();
    assert_eq!(reply.as_slice(), &[ADDR_USB, 0x32, 0x81]);
}

#[test]
fn streaming_header_follows_start() {
    let mut ring = DmaRing::<128>::new();
    let (mut writer, reader) = ring.split();
    let ready = TxReady::new();
    let mut link: Link<_, _> = Link::new(reader, CaptureUart::default(), &ready);
    let mut dispatcher: Dispatcher<()> = Dispatcher::new((), LinkConfig::default());
    link.start();

    assert!(dispatcher.streaming_msg().is_none());
    writer.write(&frame(&[0x32, ADDR_USB, CMD_START_DATA_STREAMING, 0x03, 0, 0, 0]));
    assert_eq!(dispatcher.service(&mut link), Ok(Serviced::Replied(5)));

    let mut sample = dispatcher.streaming_msg().unwrap();
    sample.push_uint(0x1234, 2).unwrap();
    link.send(&sample).unwrap();

    let sent = &link.tx().sent;
    let (_, used) = decode::<256>(sent).unwrap();
    let (streamed, _) = decode::<256>(&sent[used..]).unwrap();
    assert_eq!(
        streamed.as_slice(),
        &[ADDR_USB, 0x32, CMD_START_DATA_STREAMING, 0x34, 0x12]
    );
}

proptest! {
    #[test]
    fn foreign_address_never_answered(dest in any::<u8>(), cmd in any::<u8>()) {
        prop_assume!(dest != 0x32);

        let mut ring = DmaRing::<128>::new();
        let (mut writer, reader) = ring.split();
        let ready = TxReady::new();
        let mut link: Link<_, _> = Link::new(reader, CaptureUart::default(), &ready);
        let mut dispatcher: Dispatcher<()> = Dispatcher::new((), LinkConfig::default());
        link.start();

        writer.write(&frame(&[dest, ADDR_USB, cmd]));
        prop_assert_eq!(dispatcher.service(&mut link), Ok(Serviced::Ignored));
        prop_assert!(link.tx().sent.is_empty());
    }
}
