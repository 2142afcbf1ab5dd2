use nom::number::Endianness;

/// Decode a NUL-terminated (or NUL-padded) string. Bytes after the first NUL
/// are left in the remainder; invalid UTF-8 is replaced rather than rejected.
pub fn string_upto_null_terminator(bytes: &[u8]) -> nom::IResult<&[u8], String> {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => Ok((
            &bytes[end + 1..],
            String::from_utf8_lossy(&bytes[..end]).into_owned(),
        )),
        None => Ok((&[], String::from_utf8_lossy(bytes).into_owned())),
    }
}

/// `xxxx.yy.zz` nibble-packed version as used by dylib and min-version
/// commands.
pub fn version_string(version: u32) -> String {
    format!(
        "{}.{}.{}",
        version >> 16,
        (version >> 8) & 0xff,
        version & 0xff
    )
}

pub fn read_uleb(bytes: &[u8]) -> nom::IResult<&[u8], u64> {
    let mut result = 0;
    let mut shift = 0;
    let mut cursor = bytes;

    loop {
        let (remaining, byte) = nom::number::complete::u8(cursor)?;
        cursor = remaining;

        if shift < 64 {
            result |= ((byte & 0x7f) as u64) << shift;
        }
        if (byte & 0x80) == 0 {
            break;
        }
        shift += 7;
    }

    Ok((cursor, result))
}

pub fn read_uleb_many(mut bytes: &[u8]) -> nom::IResult<&[u8], Vec<u64>> {
    let mut result = Vec::new();
    while !bytes.is_empty() {
        let (remaining, value) = read_uleb(bytes)?;
        bytes = remaining;
        result.push(value);
    }

    Ok((bytes, result))
}

pub fn put_u32(buf: &mut Vec<u8>, value: u32, endian: Endianness) {
    match endian {
        Endianness::Big => buf.extend(value.to_be_bytes()),
        _ => buf.extend(value.to_le_bytes()),
    }
}

pub fn put_u64(buf: &mut Vec<u8>, value: u64, endian: Endianness) {
    match endian {
        Endianness::Big => buf.extend(value.to_be_bytes()),
        _ => buf.extend(value.to_le_bytes()),
    }
}

/// Write `name` into a 16-byte NUL-padded field, truncating if needed.
pub fn put_name16(buf: &mut Vec<u8>, name: &str) {
    let mut field = [0u8; 16];
    let len = name.len().min(16);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    buf.extend(field);
}

/// Classic 16-bytes-per-row hex dump with an ASCII column. Rows are padded
/// with zero bytes.
pub fn hex_dump(addr: u64, data: &[u8]) -> String {
    let mut lines = Vec::new();
    for (row, chunk) in data.chunks(16).enumerate() {
        let mut padded = [0u8; 16];
        padded[..chunk.len()].copy_from_slice(chunk);

        let hex: Vec<String> = padded.iter().map(|b| format!("{:02X}", b)).collect();
        let ascii: Vec<String> = padded
            .iter()
            .map(|&b| {
                if (33..=126).contains(&b) {
                    (b as char).to_string()
                } else {
                    ".".to_string()
                }
            })
            .collect();

        lines.push(format!(
            "{:X}: {}   {}",
            addr.wrapping_add((row as u64) * 16),
            hex.join(" "),
            ascii.join(" ")
        ));
    }
    lines.join("\n")
}
