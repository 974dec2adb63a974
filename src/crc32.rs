//! CRC-32 (IEEE, reflected `0xEDB88320`), as used on every chunk.

const CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
  let mut out = [0; 256];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      if (c & 1) != 0 {
        c = 0xEDB8_8320_u32 ^ (c >> 1);
      } else {
        c >>= 1;
      }
      k += 1;
    }
    out[n] = c;
    n += 1;
  }
  out
}

#[inline]
fn update_crc(mut crc: u32, bytes: &[u8]) -> u32 {
  for &byte in bytes {
    let i = (crc ^ u32::from(byte)) as u8 as usize;
    crc = CRC_TABLE[i] ^ (crc >> 8);
  }
  crc
}

/// The CRC of a chunk: computed over the type tag followed by the payload.
#[inline]
#[must_use]
pub fn chunk_crc(chunk_type: [u8; 4], data: &[u8]) -> u32 {
  update_crc(update_crc(u32::MAX, &chunk_type), data) ^ u32::MAX
}

/// CRC-32 of a plain byte slice.
#[inline]
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
  update_crc(u32::MAX, bytes) ^ u32::MAX
}

#[test]
fn test_crc32_known_values() {
  assert_eq!(crc32(b""), 0);
  assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
  // the IEND chunk of every PNG ends in these bytes
  assert_eq!(chunk_crc(*b"IEND", &[]), 0xAE42_6082);
  assert_eq!(chunk_crc(*b"tEXt", b"a\0b"), crc32(b"tEXta\0b"));
}
