// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Chunked AEAD for secret payloads of unbounded size.
//!
//! Payloads are encrypted with AES-256-GCM in the STREAM construction
//! (big-endian 32-bit chunk counter plus last-chunk flag in the nonce), so
//! every chunk is authenticated and truncation or reordering of chunks is
//! detected on decryption.
//!
//! Wire format:
//!
//! ```text
//! nonce_prefix (7 bytes) || chunk_0 || chunk_1 || ... || chunk_last
//! ```
//!
//! Every chunk except the last carries exactly [`STREAM_CHUNK_SIZE`] bytes of
//! plaintext plus a 16 byte tag. The last chunk carries 0..=[`STREAM_CHUNK_SIZE`]
//! bytes plus a tag. Neither side ever holds more than one chunk in memory.

use std::io::{self, Read};

use aes_gcm::{
	aead::{
		generic_array::GenericArray,
		stream::{DecryptorBE32, EncryptorBE32},
		OsRng,
	},
	Aes256Gcm,
};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{KeysError, KeysResult};
use crate::keys::cipher_for;

/// Plaintext bytes per chunk.
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Random nonce prefix written at the start of every stream.
pub const STREAM_NONCE_PREFIX_SIZE: usize = 7;

const TAG_SIZE: usize = 16;

fn stream_error() -> io::Error {
	io::Error::new(io::ErrorKind::InvalidData, KeysError::DecryptFailed)
}

/// Reads until `buf` holds `target` bytes or the reader is exhausted.
fn fill_to<R: Read>(reader: &mut R, buf: &mut Vec<u8>, target: usize) -> io::Result<()> {
	let mut filled = buf.len();
	buf.resize(target, 0);
	while filled < target {
		match reader.read(&mut buf[filled..]) {
			Ok(0) => break,
			Ok(n) => filled += n,
			Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
			Err(e) => {
				buf.truncate(filled);
				return Err(e);
			}
		}
	}
	buf.truncate(filled);
	Ok(())
}

fn drain_into(output: &[u8], position: &mut usize, buf: &mut [u8]) -> usize {
	let n = buf.len().min(output.len() - *position);
	buf[..n].copy_from_slice(&output[*position..*position + n]);
	*position += n;
	n
}

/// Wrap `reader` so that reading yields the encrypted stream.
///
/// `dek` must be [`crate::KEY_SIZE`] bytes.
pub fn encrypt_stream<R: Read>(reader: R, dek: &[u8]) -> KeysResult<EncryptingReader<R>> {
	EncryptingReader::with_chunk_size(reader, dek, STREAM_CHUNK_SIZE)
}

/// Wrap `reader` (an encrypted stream) so that reading yields plaintext.
///
/// Reads fail with [`io::ErrorKind::InvalidData`] as soon as a chunk fails
/// authentication or the stream ends without a final chunk. Callers must
/// discard any plaintext already read when that happens.
pub fn decrypt_stream<R: Read>(reader: R, dek: &[u8]) -> KeysResult<DecryptingReader<R>> {
	DecryptingReader::with_chunk_size(reader, dek, STREAM_CHUNK_SIZE)
}

pub struct EncryptingReader<R> {
	inner: R,
	encryptor: Option<EncryptorBE32<Aes256Gcm>>,
	chunk_size: usize,
	plaintext: Zeroizing<Vec<u8>>,
	output: Vec<u8>,
	position: usize,
}

impl<R: Read> EncryptingReader<R> {
	pub(crate) fn with_chunk_size(inner: R, dek: &[u8], chunk_size: usize) -> KeysResult<Self> {
		let cipher = cipher_for(dek)?;

		let mut prefix = [0u8; STREAM_NONCE_PREFIX_SIZE];
		OsRng.fill_bytes(&mut prefix);
		let encryptor = EncryptorBE32::from_aead(cipher, GenericArray::from_slice(&prefix));

		Ok(Self {
			inner,
			encryptor: Some(encryptor),
			chunk_size,
			plaintext: Zeroizing::new(Vec::with_capacity(chunk_size + 1)),
			output: prefix.to_vec(),
			position: 0,
		})
	}

	fn refill(&mut self) -> io::Result<()> {
		self.output.clear();
		self.position = 0;

		// One byte past the chunk tells us whether this is the last chunk.
		fill_to(&mut self.inner, &mut self.plaintext, self.chunk_size + 1)?;

		if self.plaintext.len() > self.chunk_size {
			let Some(encryptor) = self.encryptor.as_mut() else {
				return Ok(());
			};
			self.output = encryptor
				.encrypt_next(&self.plaintext[..self.chunk_size])
				.map_err(|_| {
					io::Error::new(
						io::ErrorKind::Other,
						KeysError::Internal("stream chunk limit exceeded".to_string()),
					)
				})?;
			self.plaintext.drain(..self.chunk_size);
		} else {
			let Some(encryptor) = self.encryptor.take() else {
				return Ok(());
			};
			self.output = encryptor
				.encrypt_last(self.plaintext.as_slice())
				.map_err(|_| {
					io::Error::new(
						io::ErrorKind::Other,
						KeysError::Internal("stream finalisation failed".to_string()),
					)
				})?;
			self.plaintext.zeroize();
		}
		Ok(())
	}
}

impl<R: Read> Read for EncryptingReader<R> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}
		loop {
			if self.position < self.output.len() {
				return Ok(drain_into(&self.output, &mut self.position, buf));
			}
			if self.encryptor.is_none() {
				return Ok(0);
			}
			self.refill()?;
		}
	}
}

enum DecryptState {
	Header(Aes256Gcm),
	Body(DecryptorBE32<Aes256Gcm>),
	Done,
	Failed,
}

pub struct DecryptingReader<R> {
	inner: R,
	state: DecryptState,
	chunk_size: usize,
	ciphertext: Vec<u8>,
	output: Zeroizing<Vec<u8>>,
	position: usize,
}

impl<R: Read> DecryptingReader<R> {
	pub(crate) fn with_chunk_size(inner: R, dek: &[u8], chunk_size: usize) -> KeysResult<Self> {
		let cipher = cipher_for(dek)?;
		Ok(Self {
			inner,
			state: DecryptState::Header(cipher),
			chunk_size,
			ciphertext: Vec::with_capacity(chunk_size + TAG_SIZE + 1),
			output: Zeroizing::new(Vec::new()),
			position: 0,
		})
	}

	fn refill(&mut self) -> io::Result<()> {
		self.output.zeroize();
		self.position = 0;

		// Anything that returns early with an error leaves the reader failed.
		match std::mem::replace(&mut self.state, DecryptState::Failed) {
			DecryptState::Header(cipher) => {
				let mut prefix = Vec::with_capacity(STREAM_NONCE_PREFIX_SIZE);
				fill_to(&mut self.inner, &mut prefix, STREAM_NONCE_PREFIX_SIZE)?;
				if prefix.len() < STREAM_NONCE_PREFIX_SIZE {
					return Err(stream_error());
				}
				self.state = DecryptState::Body(DecryptorBE32::from_aead(
					cipher,
					GenericArray::from_slice(&prefix),
				));
			}
			DecryptState::Body(mut decryptor) => {
				let sealed_chunk = self.chunk_size + TAG_SIZE;
				fill_to(&mut self.inner, &mut self.ciphertext, sealed_chunk + 1)?;

				if self.ciphertext.len() > sealed_chunk {
					let plaintext = decryptor
						.decrypt_next(&self.ciphertext[..sealed_chunk])
						.map_err(|_| stream_error())?;
					self.output = Zeroizing::new(plaintext);
					self.ciphertext.drain(..sealed_chunk);
					self.state = DecryptState::Body(decryptor);
				} else {
					let plaintext = decryptor
						.decrypt_last(self.ciphertext.as_slice())
						.map_err(|_| stream_error())?;
					self.output = Zeroizing::new(plaintext);
					self.ciphertext.clear();
					self.state = DecryptState::Done;
				}
			}
			DecryptState::Done => self.state = DecryptState::Done,
			DecryptState::Failed => return Err(stream_error()),
		}
		Ok(())
	}
}

impl<R: Read> Read for DecryptingReader<R> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}
		loop {
			if self.position < self.output.len() {
				return Ok(drain_into(&self.output, &mut self.position, buf));
			}
			match self.state {
				DecryptState::Done => return Ok(0),
				DecryptState::Failed => return Err(stream_error()),
				DecryptState::Header(_) | DecryptState::Body(_) => self.refill()?,
			}
		}
	}
}
