//! Inventory handoff to the step launcher
//!
//! A frame is a little-endian `u32` body length followed by a JSON array of
//! device records. Parent and child always come from the same build, so the
//! layout is not versioned.

use gres_core::{DeviceRecord, GresError, GresResult, Inventory};
use std::io::{Read, Write};
use tracing::debug;

/// Largest frame body accepted from a peer
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Write the inventory to `writer`; `None` is sent as zero records
pub fn send<W: Write + ?Sized>(
    writer: &mut W,
    inventory: Option<&Inventory>,
) -> GresResult<()> {
    let records = inventory.map(Inventory::devices).unwrap_or_default();
    let body = serde_json::to_vec(records)?;

    let len = u32::try_from(body.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| {
            GresError::Transport(format!("inventory frame of {} bytes is too large", body.len()))
        })?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;

    debug!(devices = records.len(), bytes = len, "Sent device inventory");
    Ok(())
}

/// Read an inventory written by [`send`]; zero records yield `None`
pub fn receive<R: Read + ?Sized>(reader: &mut R) -> GresResult<Option<Inventory>> {
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .map_err(|e| GresError::Transport(format!("failed to read frame length: {}", e)))?;

    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(GresError::Transport(format!(
            "inventory frame of {} bytes exceeds limit of {}",
            len, MAX_FRAME_LEN
        )));
    }

    let mut body = vec![0u8; len as usize];
    reader
        .read_exact(&mut body)
        .map_err(|e| GresError::Transport(format!("failed to read frame body: {}", e)))?;

    let records: Vec<DeviceRecord> = serde_json::from_slice(&body)?;
    debug!(devices = records.len(), "Received device inventory");

    if records.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Inventory::from_records(records)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_inventory() -> Inventory {
        let mut inventory = Inventory::new();
        inventory.push("/dev/a", "GPU-x0".to_string());
        inventory.push("/dev/a", "GPU-x1".to_string());
        inventory.push("/dev/b", "7".to_string());
        inventory
    }

    #[test]
    fn test_send_receive() {
        let inventory = sample_inventory();
        let mut channel = Vec::new();
        send(&mut channel, Some(&inventory)).unwrap();

        let received = receive(&mut Cursor::new(channel)).unwrap();
        assert_eq!(received, Some(inventory));
    }

    #[test]
    fn test_device_numbers_kept() {
        let inventory = Inventory::from_records(vec![DeviceRecord {
            path: "/dev/c".to_string(),
            major: "Z".to_string(),
            device_number: 9,
        }]);
        let mut channel = Vec::new();
        send(&mut channel, Some(&inventory)).unwrap();

        let received = receive(&mut Cursor::new(channel)).unwrap().unwrap();
        assert_eq!(received.get(0).unwrap().device_number, 9);
    }

    #[test]
    fn test_empty_inventory() {
        let mut channel = Vec::new();
        send(&mut channel, None).unwrap();
        assert_eq!(channel.len(), 6);
        assert_eq!(receive(&mut Cursor::new(channel)).unwrap(), None);
    }

    #[test]
    fn test_truncated_frame() {
        let mut channel = Vec::new();
        send(&mut channel, Some(&sample_inventory())).unwrap();
        channel.truncate(channel.len() - 3);

        let err = receive(&mut Cursor::new(channel)).unwrap_err();
        assert!(matches!(err, GresError::Transport(_)));

        let err = receive(&mut Cursor::new(vec![1u8, 0])).unwrap_err();
        assert!(matches!(err, GresError::Transport(_)));
    }

    #[test]
    fn test_oversized_frame() {
        let channel = (MAX_FRAME_LEN + 1).to_le_bytes().to_vec();
        let err = receive(&mut Cursor::new(channel)).unwrap_err();
        assert!(matches!(err, GresError::Transport(_)));
    }

    #[test]
    fn test_garbage_body() {
        let mut channel = 3u32.to_le_bytes().to_vec();
        channel.extend_from_slice(b"{{{");
        let err = receive(&mut Cursor::new(channel)).unwrap_err();
        assert!(matches!(err, GresError::Serialization(_)));
    }
}
