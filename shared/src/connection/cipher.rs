use super::error::ConnectionError;

/// Hook point for payload encryption. The core does not define a cipher; a
/// surrounding collaborator installs one per connection and the pipeline
/// sets the encrypted flag bit when it is applied.
pub trait PacketCipher: Send {
    fn encrypt(&self, payload: &mut Vec<u8>);
    fn decrypt(&self, payload: &mut Vec<u8>) -> Result<(), ConnectionError>;
}
