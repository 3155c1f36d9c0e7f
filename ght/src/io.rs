/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

//! Byte-stream backends a tree is written to and read from: either a
//! growable in-memory buffer, or a file opened in append/read-only mode.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Cursor, Read as _, Write as _};
use std::path::Path;

const INITIAL_MEMORY_CAPACITY: usize = 1028;

/// An append-only destination for a serialized tree.
pub enum Writer {
    Memory(Vec<u8>),
    File(BufWriter<File>),
}

impl Writer {
    /// A growable in-memory buffer, `INITIAL_MEMORY_CAPACITY` bytes to
    /// start, doubling as `Vec` fills.
    pub fn memory() -> Writer {
        Writer::Memory(Vec::with_capacity(INITIAL_MEMORY_CAPACITY))
    }

    /// Opens `path` for writing, refusing to clobber an existing file.
    pub fn create_file(path: impl AsRef<Path>) -> io::Result<Writer> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(Writer::File(BufWriter::new(file)))
    }

    /// Hands back the accumulated bytes of a memory-backed writer, or
    /// `None` if this writer is file-backed.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Writer::Memory(buf) => Some(buf),
            Writer::File(_) => None,
        }
    }

    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Writer::Memory(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            Writer::File(w) => w.write_all(bytes),
        }
    }
}

/// A sequential source a serialized tree is read back from.
pub enum Reader<'a> {
    Memory(Cursor<&'a [u8]>),
    File(BufReader<File>),
}

impl<'a> Reader<'a> {
    pub fn memory(bytes: &'a [u8]) -> Reader<'a> {
        Reader::Memory(Cursor::new(bytes))
    }

    pub fn open_file(path: impl AsRef<Path>) -> io::Result<Reader<'static>> {
        Ok(Reader::File(BufReader::new(File::open(path)?)))
    }

    fn is_file_backed(&self) -> bool {
        matches!(self, Reader::File(_))
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let result = match self {
            Reader::Memory(c) => c.read_exact(buf),
            Reader::File(r) => r.read_exact(buf),
        };
        if let Err(ref e) = result {
            if self.is_file_backed() {
                log::warn!("short read from file-backed stream: {}", e);
            }
        }
        result
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact_into(&mut byte)?;
        Ok(byte[0])
    }

    pub fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        self.read_exact_into(&mut bytes)?;
        Ok(bytes)
    }
}
