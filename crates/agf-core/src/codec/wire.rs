//! Binary layout of a serialized [`ChannelSampleGroup`].
//!
//! ```text
//! magic "EHAG" | version u8 | discriminator | count leb128 | member*
//!
//! discriminator: realtime u8 | sse u8 | category u8 | vcid opt<u32>
//!                | dss u32 | apid u32 | coarse_bits u8 | fine_bits u8
//! member:        channel_id str | name str | module str ("" = absent)
//!                | packet_id leb128 | dn | eu opt<f64> | status opt<str>
//!                | dn_format opt<str> | eu_format opt<str>
//!                | alarms (leb128 count, level u8 in_alarm u8 on_eu u8)
//!                | ert time | rct time | scet opt<time> | sclk opt<leb128 leb128>
//! dn:            type u8 | width u8 | payload (width/8 bytes; ASCII: str)
//! str:           leb128 length | utf-8 bytes
//! time:          millis i64 | sub-ms nanos u32
//! opt<T>:        presence u8 | T
//! ```
//!
//! Fixed-width integers are little-endian.

use agf_common::{
    AccurateTime, AlarmLevel, AlarmValue, ChannelSampleGroup, ChannelSampleMember, ChannelType,
    DefinitionCategory, Error, GroupDiscriminator, RawDn, Result, Sclk, SclkEncoding,
};

pub const GROUP_MAGIC: [u8; 4] = *b"EHAG";
pub const GROUP_VERSION: u8 = 1;

// ── Writer ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn leb128(&mut self, mut v: u64) {
        loop {
            let byte = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn str(&mut self, s: &str) {
        self.leb128(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn opt<T>(&mut self, v: Option<T>, mut write: impl FnMut(&mut Self, T)) {
        match v {
            Some(v) => {
                self.u8(1);
                write(self, v);
            }
            None => self.u8(0),
        }
    }

    fn time(&mut self, t: &AccurateTime) {
        self.i64(t.millis());
        self.u32(t.sub_millis_nanos());
    }
}

// ── Reader ──────────────────────────────────────────────────────────────

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof { context });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, context)?);
        Ok(out)
    }

    fn u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.take(1, context)?[0])
    }

    fn bool(&mut self, context: &'static str) -> Result<bool> {
        match self.u8(context)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::MalformedGroup(format!(
                "{}: flag byte must be 0 or 1, got {}",
                context, other
            ))),
        }
    }

    fn u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(context)?))
    }

    fn i64(&mut self, context: &'static str) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array(context)?))
    }

    fn f64(&mut self, context: &'static str) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array(context)?))
    }

    fn leb128(&mut self, context: &'static str) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.u8(context)?;
            if shift >= 64 || (shift == 63 && byte & 0x7E != 0) {
                return Err(Error::MalformedGroup(format!("{}: varint overflows u64", context)));
            }
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    fn len(&mut self, context: &'static str) -> Result<usize> {
        let n = self.leb128(context)?;
        usize::try_from(n)
            .ok()
            .filter(|n| *n <= self.remaining())
            .ok_or_else(|| {
                Error::MalformedGroup(format!(
                    "{}: length {} exceeds remaining {} bytes",
                    context,
                    n,
                    self.remaining()
                ))
            })
    }

    fn str(&mut self, context: &'static str) -> Result<String> {
        let len = self.len(context)?;
        let bytes = self.take(len, context)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::MalformedGroup(format!("{}: {}", context, e)))
    }

    fn opt<T>(
        &mut self,
        context: &'static str,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<T>> {
        if self.bool(context)? {
            read(self).map(Some)
        } else {
            Ok(None)
        }
    }

    fn time(&mut self, context: &'static str) -> Result<AccurateTime> {
        let millis = self.i64(context)?;
        let nanos = self.u32(context)?;
        AccurateTime::new(millis, nanos)
    }
}

// ── Group encoding ──────────────────────────────────────────────────────

/// Serialize a group. Fails when a DN payload does not match its width.
pub fn encode_group(group: &ChannelSampleGroup) -> Result<Vec<u8>> {
    let mut w = ByteWriter::default();
    w.buf.extend_from_slice(&GROUP_MAGIC);
    w.u8(GROUP_VERSION);

    let d = &group.discriminator;
    w.bool(d.realtime);
    w.bool(d.from_sse);
    w.u8(d.category.code());
    w.opt(d.vcid, |w, v| w.u32(v));
    w.u32(d.dss_id);
    w.u32(d.apid);
    w.u8(d.sclk_encoding.coarse_bits);
    w.u8(d.sclk_encoding.fine_bits);

    w.leb128(group.members.len() as u64);
    for m in &group.members {
        encode_member(&mut w, m)?;
    }
    Ok(w.buf)
}

fn encode_member(w: &mut ByteWriter, m: &ChannelSampleMember) -> Result<()> {
    w.str(&m.channel_id);
    w.str(&m.name);
    w.str(m.module.as_deref().unwrap_or(""));
    w.leb128(m.packet_id);
    encode_dn(w, &m.dn)?;
    w.opt(m.eu, |w, v| w.f64(v));
    w.opt(m.status.as_deref(), |w, v| w.str(v));
    w.opt(m.dn_format.as_deref(), |w, v| w.str(v));
    w.opt(m.eu_format.as_deref(), |w, v| w.str(v));
    w.leb128(m.alarms.len() as u64);
    for alarm in &m.alarms {
        w.u8(alarm.level.code());
        w.bool(alarm.in_alarm);
        w.bool(alarm.on_eu);
    }
    w.time(&m.ert);
    w.time(&m.rct);
    w.opt(m.scet.as_ref(), |w, t| w.time(t));
    w.opt(m.sclk.as_ref(), |w, s| {
        w.leb128(s.coarse());
        w.leb128(s.fine());
    });
    Ok(())
}

fn encode_dn(w: &mut ByteWriter, dn: &RawDn) -> Result<()> {
    w.u8(dn.type_code);
    w.u8(dn.width);
    if dn.type_code == ChannelType::Ascii.code() {
        w.leb128(dn.payload.len() as u64);
    } else if dn.payload.len() != usize::from(dn.width / 8) {
        return Err(Error::MalformedDn(format!(
            "payload of {} bytes does not match width {}",
            dn.payload.len(),
            dn.width
        )));
    }
    w.buf.extend_from_slice(&dn.payload);
    Ok(())
}

// ── Group decoding ──────────────────────────────────────────────────────

/// Deserialize a group produced by [`encode_group`].
///
/// DN payloads are returned raw; resolving them into typed values happens at
/// record construction so one bad DN does not sink its whole group.
pub fn decode_group(bytes: &[u8]) -> Result<ChannelSampleGroup> {
    let mut r = ByteReader::new(bytes);
    let magic: [u8; 4] = r.array("magic")?;
    if magic != GROUP_MAGIC {
        return Err(Error::BadMagic {
            expected: GROUP_MAGIC,
            actual: magic,
        });
    }
    let version = r.u8("version")?;
    if version != GROUP_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let realtime = r.bool("realtime flag")?;
    let from_sse = r.bool("sse flag")?;
    let category_code = r.u8("definition category")?;
    let category = DefinitionCategory::from_code(category_code).ok_or_else(|| {
        Error::MalformedGroup(format!("unknown definition category {}", category_code))
    })?;
    let vcid = r.opt("vcid", |r| r.u32("vcid"))?;
    let dss_id = r.u32("dss id")?;
    let apid = r.u32("apid")?;
    let coarse_bits = r.u8("sclk coarse bits")?;
    let fine_bits = r.u8("sclk fine bits")?;

    let discriminator = GroupDiscriminator {
        realtime,
        from_sse,
        category,
        vcid,
        dss_id,
        apid,
        sclk_encoding: SclkEncoding::new(coarse_bits, fine_bits),
    };

    let count = r.len("member count")?;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        members.push(decode_member(&mut r)?);
    }

    if r.remaining() != 0 {
        return Err(Error::MalformedGroup(format!(
            "{} trailing bytes after last member",
            r.remaining()
        )));
    }

    Ok(ChannelSampleGroup {
        discriminator,
        members,
    })
}

fn decode_member(r: &mut ByteReader<'_>) -> Result<ChannelSampleMember> {
    let channel_id = r.str("channel id")?;
    let name = r.str("channel name")?;
    let module = Some(r.str("module")?).filter(|m| !m.is_empty());
    let packet_id = r.leb128("packet id")?;
    let dn = decode_dn(r)?;
    let eu = r.opt("eu", |r| r.f64("eu"))?;
    let status = r.opt("status", |r| r.str("status"))?;
    let dn_format = r.opt("dn format", |r| r.str("dn format"))?;
    let eu_format = r.opt("eu format", |r| r.str("eu format"))?;

    let alarm_count = r.len("alarm count")?;
    let mut alarms = Vec::with_capacity(alarm_count);
    for _ in 0..alarm_count {
        let code = r.u8("alarm level")?;
        let level = AlarmLevel::from_code(code)
            .ok_or_else(|| Error::MalformedGroup(format!("unknown alarm level {}", code)))?;
        alarms.push(AlarmValue {
            level,
            in_alarm: r.bool("alarm in_alarm")?,
            on_eu: r.bool("alarm on_eu")?,
        });
    }

    let ert = r.time("ert")?;
    let rct = r.time("rct")?;
    let scet = r.opt("scet", |r| r.time("scet"))?;
    let sclk = r.opt("sclk", |r| {
        let coarse = r.leb128("sclk coarse")?;
        let fine = r.leb128("sclk fine")?;
        Ok(Sclk::new(coarse, fine))
    })?;

    Ok(ChannelSampleMember {
        channel_id,
        name,
        module,
        packet_id,
        dn,
        eu,
        status,
        dn_format,
        eu_format,
        alarms,
        ert,
        rct,
        scet,
        sclk,
    })
}

fn decode_dn(r: &mut ByteReader<'_>) -> Result<RawDn> {
    let type_code = r.u8("dn type")?;
    let width = r.u8("dn width")?;
    let len = if type_code == ChannelType::Ascii.code() {
        r.len("ascii dn length")?
    } else {
        usize::from(width / 8)
    };
    let payload = r.take(len, "dn payload")?.to_vec();
    Ok(RawDn {
        type_code,
        width,
        payload,
    })
}
