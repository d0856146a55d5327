use stl_core::{
    AsciiWriterOptions, BinaryWriterOptions, Callbacks, ErrorCode, LineEnding, Parser, Sink, Status,
    StlError, StlFormat, StlParser, StlResult, StlWriter, Triangle, VecSink, Writer, WriterConfig,
    WriterState,
};

fn facets(n: usize) -> Vec<Triangle> {
    (0..n)
        .map(|i| {
            let z = i as f64 * 0.25;
            Triangle::new(
                [0.0, 0.0, 1.0],
                [[0.0, 0.0, z], [1.5, 0.0, z], [0.0, 1.5, z]],
            )
            .with_attributes(vec![0xAB; i % 3])
        })
        .collect()
}

/// Drives `status` to completion, granting `step` bytes per stall.
fn drain(writer: &mut StlWriter<'_, VecSink>, mut status: Status, step: usize) -> (Status, usize) {
    let mut stalls = 0;
    while status == Status::Continues {
        stalls += 1;
        match writer {
            StlWriter::Binary(w) => w.sink_mut().grant(step),
            StlWriter::Ascii(w) => w.sink_mut().grant(step),
        }
        status = writer.resume().unwrap();
    }
    (status, stalls)
}

fn write_trickled(config: WriterConfig, triangles: &[Triangle], step: usize) -> Vec<u8> {
    let mut writer = StlWriter::new(VecSink::with_budget(step), config)
        .unwrap()
        .on_error(|_| stl_core::Recovery::Keep);
    let (status, _) = drain(&mut writer, Status::Continues, step);
    assert_eq!(status, Status::Ok);
    for tri in triangles {
        let status = writer.write_triangle(tri).unwrap();
        assert_eq!(drain(&mut writer, status, step).0, Status::Ok);
    }
    let status = writer.finalize().unwrap();
    assert_eq!(drain(&mut writer, status, step).0, Status::Done);
    assert_eq!(writer.state(), WriterState::Done);
    assert_eq!(writer.triangles_written(), triangles.len() as u32);
    match &writer {
        StlWriter::Binary(w) => w.sink().data().to_vec(),
        StlWriter::Ascii(w) => w.sink().data().to_vec(),
    }
}

#[test]
fn binary_output_is_independent_of_stall_pattern() {
    let triangles = facets(7);
    let config = WriterConfig::Binary(BinaryWriterOptions::new().with_header(b"trickle"));
    let reference = write_trickled(config.clone(), &triangles, usize::MAX / 2);
    for step in [1, 3, 13, 50, 51] {
        assert_eq!(write_trickled(config.clone(), &triangles, step), reference, "step {step}");
    }

    let mut attributes = Vec::new();
    {
        let mut parser = StlParser::new(
            StlFormat::Binary,
            Callbacks::new().on_triangle(|t| {
                attributes.push(t.attributes.len());
                Ok(())
            }),
        );
        assert_eq!(parser.parse_buffer(&reference).unwrap(), Status::Done);
    }
    assert_eq!(attributes, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn ascii_output_is_independent_of_stall_pattern() {
    let triangles = facets(4);
    let config = WriterConfig::Ascii(AsciiWriterOptions::new().with_line_ending(LineEnding::CrLf));
    let reference = write_trickled(config.clone(), &triangles, usize::MAX / 2);
    for step in [1, 2, 7] {
        assert_eq!(write_trickled(config.clone(), &triangles, step), reference, "step {step}");
    }
    let text = String::from_utf8(reference).unwrap();
    assert_eq!(text.matches("endfacet\r\n").count(), 4);
    assert!(!text.contains("\r\r"));
}

/// Sink whose first seek fails.
#[derive(Default)]
struct FlakySeek {
    inner: VecSink,
    seeks: usize,
}

impl Sink for FlakySeek {
    fn write_bytes(&mut self, bytes: &[u8]) -> StlResult<usize> {
        self.inner.write_bytes(bytes)
    }

    fn seek_absolute(&mut self, offset: u64) -> StlResult<()> {
        self.seeks += 1;
        if self.seeks == 1 {
            return Err(StlError::new(ErrorCode::Io, "seek not ready"));
        }
        self.inner.seek_absolute(offset)
    }

    fn seek_relative(&mut self, delta: i64) -> StlResult<()> {
        self.inner.seek_relative(delta)
    }

    fn release(&mut self) -> StlResult<()> {
        self.inner.release()
    }
}

#[test]
fn failed_seek_can_be_retried() {
    let mut sink = FlakySeek::default();
    {
        let mut writer = StlWriter::binary(&mut sink, BinaryWriterOptions::new()).unwrap();
        for tri in facets(2) {
            let _ = writer.write_triangle(&tri).unwrap();
        }
        let err = writer.finalize().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Io);
        assert_eq!(writer.state(), WriterState::Finalizing);
        assert_eq!(writer.finalize().unwrap(), Status::Done);
    }
    assert_eq!(sink.seeks, 2);
    assert_eq!(sink.inner.release_count(), 1);
    assert_eq!(&sink.inner.data()[80..84], &2u32.to_le_bytes());
}

#[test]
fn write_while_pending_is_rejected() {
    let mut writer = StlWriter::binary(VecSink::with_budget(84 + 10), BinaryWriterOptions::new()).unwrap();
    assert_eq!(writer.state(), WriterState::Accepting);
    let triangles = facets(1);
    let tri = &triangles[0];
    assert_eq!(writer.write_triangle(tri).unwrap(), Status::Continues);
    assert_eq!(writer.state(), WriterState::Flushing);
    assert_eq!(writer.write_triangle(tri).unwrap_err().code(), ErrorCode::InvalidState);
    assert_eq!(writer.finalize().unwrap_err().code(), ErrorCode::InvalidState);
    assert_eq!(writer.triangles_written(), 0);
}
