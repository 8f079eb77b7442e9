//! Envelopes and payloads
//!
//! Client → server: `RequestInfo` then the request payload.
//! Server → client: `ResponseInfo` then the response payload. Pushes and
//! failure responses use the same header.

use bytes::{BufMut, Bytes, BytesMut};
use huddle_core::{BoundedName, Channel, ChannelMessage, NAME_CAPACITY};

use super::codec::{
    put_name, put_text, text_wire_len, wire_count, CodecError, Decode, Encode, Reader,
};
use super::request_type::{RequestType, Status};

// ============================================================================
// Envelope headers
// ============================================================================

/// Client request header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestInfo {
    pub request_type: RequestType,
}

impl Encode for RequestInfo {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.request_type.as_u32());
    }
}

impl Decode for RequestInfo {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let raw = reader.read_u32()?;
        let request_type =
            RequestType::from_u32(raw).ok_or(CodecError::UnknownRequestType(raw))?;
        Ok(Self { request_type })
    }
}

/// Server response and push header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseInfo {
    pub request_type: RequestType,
    pub status: Status,
}

impl Encode for ResponseInfo {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.request_type.as_u32());
        buf.put_u32_le(self.status.as_u32());
    }
}

impl Decode for ResponseInfo {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let raw_type = reader.read_u32()?;
        let raw_status = reader.read_u32()?;
        Ok(Self {
            request_type: RequestType::from_u32(raw_type)
                .ok_or(CodecError::UnknownRequestType(raw_type))?,
            status: Status::from_u32(raw_status).ok_or(CodecError::UnknownStatus(raw_status))?,
        })
    }
}

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinServerRequest {
    pub username: BoundedName,
}

impl Encode for JoinServerRequest {
    fn encode(&self, buf: &mut BytesMut) {
        put_name(buf, &self.username);
    }
}

impl Decode for JoinServerRequest {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            username: reader.read_name()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadChannelDataRequest {
    pub channel_id: u32,
}

impl Encode for LoadChannelDataRequest {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.channel_id);
    }
}

impl Decode for LoadChannelDataRequest {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            channel_id: reader.read_u32()?,
        })
    }
}

/// `{byte_len, channel_id}` then `byte_len` bytes of NUL-terminated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub channel_id: u32,
    pub text: String,
}

impl Encode for SendMessageRequest {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(text_wire_len(&self.text));
        buf.put_u32_le(self.channel_id);
        put_text(buf, &self.text);
    }
}

impl Decode for SendMessageRequest {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let byte_len = reader.read_u32()? as usize;
        let channel_id = reader.read_u32()?;
        let text = reader.read_text(byte_len)?;
        Ok(Self { channel_id, text })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNewChannelRequest {
    pub name: BoundedName,
}

impl Encode for CreateNewChannelRequest {
    fn encode(&self, buf: &mut BytesMut) {
        put_name(buf, &self.name);
    }
}

impl Decode for CreateNewChannelRequest {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: reader.read_name()?,
        })
    }
}

// ============================================================================
// Response payloads
// ============================================================================

/// Channel row: `{id:u32, name[20], hosted_server_id:u16}` plus two bytes of
/// padding, matching the 28-byte in-memory layout clients copy rows into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRow(pub Channel);

const CHANNEL_ROW_PADDING: usize = 2;

impl Encode for ChannelRow {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.0.id);
        put_name(buf, &self.0.name);
        buf.put_u16_le(self.0.hosted_server_id);
        buf.put_bytes(0, CHANNEL_ROW_PADDING);
    }
}

impl Decode for ChannelRow {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let id = reader.read_u32()?;
        let name = reader.read_name()?;
        let hosted_server_id = reader.read_u16()?;
        reader.skip(CHANNEL_ROW_PADDING)?;
        Ok(Self(Channel::new(id, name, hosted_server_id)))
    }
}

/// `channel_count:u32` then the rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelList(pub Vec<Channel>);

impl Encode for ChannelList {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(wire_count(self.0.len()));
        for channel in &self.0 {
            ChannelRow(channel.clone()).encode(buf);
        }
    }
}

impl Decode for ChannelList {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let count = reader.read_u32()?;
        let mut channels = Vec::new();
        for _ in 0..count {
            channels.push(ChannelRow::decode(reader)?.0);
        }
        Ok(Self(channels))
    }
}

/// One message as it travels in history responses and pushes.
/// The channel is implied by the request or push it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: u32,
    pub sender_id: u32,
    pub sender_username: BoundedName,
    pub text: String,
}

impl MessageRow {
    /// Encoded size of a row carrying `text`
    pub fn wire_len(text: &str) -> usize {
        3 * 4 + text.len() + 1 + NAME_CAPACITY
    }
}

impl From<&ChannelMessage> for MessageRow {
    fn from(message: &ChannelMessage) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            sender_username: message.sender_username.clone(),
            text: message.content.clone(),
        }
    }
}

impl Encode for MessageRow {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.id);
        buf.put_u32_le(self.sender_id);
        buf.put_u32_le(text_wire_len(&self.text));
        put_text(buf, &self.text);
        put_name(buf, &self.sender_username);
    }
}

impl Decode for MessageRow {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let id = reader.read_u32()?;
        let sender_id = reader.read_u32()?;
        let byte_len = reader.read_u32()? as usize;
        let text = reader.read_text(byte_len)?;
        let sender_username = reader.read_name()?;
        Ok(Self {
            id,
            sender_id,
            sender_username,
            text,
        })
    }
}

/// `message_count:u32` then the rows, in history/arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBatch(pub Vec<MessageRow>);

impl<'a> FromIterator<&'a ChannelMessage> for MessageBatch {
    fn from_iter<I: IntoIterator<Item = &'a ChannelMessage>>(iter: I) -> Self {
        Self(iter.into_iter().map(MessageRow::from).collect())
    }
}

impl Encode for MessageBatch {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(wire_count(self.0.len()));
        for row in &self.0 {
            row.encode(buf);
        }
    }
}

impl Decode for MessageBatch {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let count = reader.read_u32()?;
        let mut rows = Vec::new();
        for _ in 0..count {
            rows.push(MessageRow::decode(reader)?);
        }
        Ok(Self(rows))
    }
}

/// Caller's role, one byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinedServerData {
    pub admin: bool,
}

impl Encode for JoinedServerData {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(u8::from(self.admin));
    }
}

impl Decode for JoinedServerData {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            admin: reader.read_u8()? != 0,
        })
    }
}

/// Status-only responses have no payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Empty;

impl Encode for Empty {
    fn encode(&self, _buf: &mut BytesMut) {}
}

impl Decode for Empty {
    fn decode(_reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self)
    }
}

// ============================================================================
// Whole packets
// ============================================================================

/// Header plus payload for a client request
pub fn request_packet<P: Encode>(request_type: RequestType, payload: &P) -> Bytes {
    let mut buf = BytesMut::new();
    RequestInfo { request_type }.encode(&mut buf);
    payload.encode(&mut buf);
    buf.freeze()
}

/// Header plus payload for a response or push
pub fn response_packet<P: Encode>(request_type: RequestType, status: Status, payload: &P) -> Bytes {
    let mut buf = BytesMut::new();
    ResponseInfo {
        request_type,
        status,
    }
    .encode(&mut buf);
    payload.encode(&mut buf);
    buf.freeze()
}

/// Failure response: `Fail` header followed by the payload's zero value
pub fn failure_packet<P: Encode + Default>(request_type: RequestType) -> Bytes {
    response_packet(request_type, Status::Fail, &P::default())
}

/// Split an inbound response or push into its header and payload
pub fn decode_response<P: Decode>(bytes: &[u8]) -> Result<(ResponseInfo, P), CodecError> {
    let mut reader = Reader::new(bytes);
    let info = ResponseInfo::decode(&mut reader)?;
    let payload = P::decode(&mut reader)?;
    Ok((info, payload))
}
