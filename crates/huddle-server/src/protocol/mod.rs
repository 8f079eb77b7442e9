//! Wire protocol
//!
//! Fixed-layout envelopes and payloads exchanged between hosted servers
//! and chat clients. One logical message per datagram.

mod codec;
mod messages;
mod request_type;

pub use codec::{
    put_name, put_text, text_wire_len, wire_count, CodecError, Decode, Encode, Reader,
};
pub use messages::{
    decode_response, failure_packet, request_packet, response_packet, ChannelList, ChannelRow,
    CreateNewChannelRequest, Empty, JoinServerRequest, JoinedServerData, LoadChannelDataRequest,
    MessageBatch, MessageRow, RequestInfo, ResponseInfo, SendMessageRequest,
};
pub use request_type::{RequestType, Status};
