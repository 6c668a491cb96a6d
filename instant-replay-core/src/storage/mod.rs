pub mod aes_encryptor;
pub mod clip_writer;
pub mod metadata;
