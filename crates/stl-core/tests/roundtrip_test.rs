use proptest::prelude::*;
use stl_core::validate::computed_normal;
use stl_core::vector::{cross, length};
use stl_core::{
    AsciiWriterOptions, BinaryWriterOptions, Callbacks, LineEnding, NormalMode, Parser, Status,
    StlFormat, StlParser, StlWriter, Triangle, VecSink, Writer, WriterConfig,
};

fn tetrahedron() -> Vec<Triangle> {
    let a = [0.0, 0.0, 0.0];
    let b = [1.0, 0.0, 0.0];
    let c = [0.0, 1.0, 0.0];
    let d = [0.0, 0.0, 1.0];
    vec![
        Triangle::new([0.0, 0.0, -1.0], [a, c, b]),
        Triangle::new([0.0, -1.0, 0.0], [a, b, d]),
        Triangle::new([-1.0, 0.0, 0.0], [a, d, c]),
        // Slanted face: normal (1, 1, 1) / sqrt(3)
        Triangle::new([0.0; 3], [b, c, d]),
    ]
}

fn encode(triangles: &[Triangle], config: WriterConfig) -> Vec<u8> {
    let mut sink = VecSink::new();
    {
        let mut writer = StlWriter::new(&mut sink, config).unwrap();
        for tri in triangles {
            assert_eq!(writer.write_triangle(tri).unwrap(), Status::Ok);
        }
        assert_eq!(writer.finalize().unwrap(), Status::Done);
    }
    sink.into_inner()
}

fn decode(bytes: &[u8]) -> Vec<Triangle> {
    let mut out = Vec::new();
    {
        let mut parser = StlParser::new(
            StlFormat::detect(bytes),
            Callbacks::new().on_triangle(|t| {
                out.push(t.clone());
                Ok(())
            }),
        );
        assert_eq!(parser.parse_buffer(bytes).unwrap(), Status::Done);
    }
    out
}

fn assert_close(a: &Triangle, b: &Triangle, tolerance: f64) {
    let pairs = a
        .normal
        .iter()
        .chain(a.vertices.iter().flatten())
        .zip(b.normal.iter().chain(b.vertices.iter().flatten()));
    for (x, y) in pairs {
        assert!((x - y).abs() <= tolerance, "{a:?} vs {b:?}");
    }
}

#[test]
fn binary_roundtrip_with_calculated_normals() {
    let config = WriterConfig::Binary(
        BinaryWriterOptions::new().with_normal_mode(NormalMode::CalculateNormals),
    );
    let bytes = encode(&tetrahedron(), config);
    assert_eq!(bytes.len(), 84 + 4 * 50);
    let decoded = decode(&bytes);
    assert_eq!(decoded.len(), 4);
    for (orig, back) in tetrahedron().iter().zip(&decoded) {
        assert_eq!(orig.vertices, back.vertices);
    }
    let slanted = 1.0 / 3f64.sqrt();
    assert_close(
        &decoded[3],
        &Triangle::new([slanted; 3], decoded[3].vertices),
        1e-6,
    );
}

#[test]
fn ascii_roundtrip_with_calculated_normals() {
    let config = WriterConfig::Ascii(
        AsciiWriterOptions::new()
            .with_normal_mode(NormalMode::CalculateNormals)
            .with_line_ending(LineEnding::Lf)
            .with_solid_name("tetra"),
    );
    let bytes = encode(&tetrahedron(), config);
    assert!(bytes.starts_with(b"solid tetra\n"));
    assert!(bytes.ends_with(b"endsolid tetra\n"));
    let decoded = decode(&bytes);
    assert_eq!(decoded.len(), 4);
    let slanted = 1.0 / 3f64.sqrt();
    assert_close(
        &decoded[3],
        &Triangle::new([slanted; 3], decoded[3].vertices),
        1e-6,
    );
}

#[test]
fn binary_to_ascii_to_binary() {
    let binary = encode(
        &tetrahedron(),
        WriterConfig::Binary(
            BinaryWriterOptions::new().with_normal_mode(NormalMode::CalculateNormals),
        ),
    );
    let ascii = encode(
        &decode(&binary),
        WriterConfig::Ascii(
            AsciiWriterOptions::new()
                .with_precision(17)
                .with_normal_mode(NormalMode::CopyNormals),
        ),
    );
    let again = encode(
        &decode(&ascii),
        WriterConfig::Binary(BinaryWriterOptions::new().with_normal_mode(NormalMode::CopyNormals)),
    );
    assert_eq!(binary, again);
}

#[test]
fn copy_normals_output_is_idempotent() {
    let triangles: Vec<Triangle> = tetrahedron()
        .into_iter()
        .enumerate()
        .map(|(i, mut t)| {
            if t.normal == [0.0; 3] {
                t.normal = [1.0, 1.0, 1.0];
            }
            t.with_attributes(vec![i as u8; i * 4])
        })
        .collect();
    let config =
        WriterConfig::Binary(BinaryWriterOptions::new().with_normal_mode(NormalMode::CopyNormals));
    let first = encode(&triangles, config.clone());
    let second = encode(&triangles, config);
    assert_eq!(first, second);
    assert_eq!(first.len(), 84 + 4 * 50 + 4 + 8 + 12);

    let decoded = decode(&first);
    assert_eq!(decoded[3].attributes, vec![3u8; 12]);
    assert_eq!(decoded[3].normal, [1.0, 1.0, 1.0]);
}

#[test]
fn empty_solids() {
    for config in [
        WriterConfig::Binary(BinaryWriterOptions::new()),
        WriterConfig::Ascii(AsciiWriterOptions::new()),
    ] {
        let bytes = encode(&[], config);
        assert!(decode(&bytes).is_empty());
    }
}

#[test]
fn byte_at_a_time_feeding_matches_one_shot() {
    let bytes = encode(
        &tetrahedron(),
        WriterConfig::Ascii(
            AsciiWriterOptions::new()
                .with_normal_mode(NormalMode::CalculateNormals)
                .with_line_ending(LineEnding::Lf),
        ),
    );
    let mut fed = Vec::new();
    {
        let mut parser = StlParser::new(
            StlFormat::Ascii,
            Callbacks::new().on_triangle(|t| {
                fed.push(t.clone());
                Ok(())
            }),
        );
        let mut status = Status::Ok;
        for &byte in &bytes {
            status = parser.feed_byte(byte).unwrap();
        }
        assert_eq!(status, Status::Done);
        assert_eq!(parser.triangles_parsed(), 4);
    }
    assert_eq!(fed, decode(&bytes));
}

/// Off-grid triangle whose coordinates change when narrowed or printed.
fn skewed() -> Triangle {
    Triangle::new(
        [0.0; 3],
        [[10.1, 20.2, 3.3], [11.7, 20.9, 3.1], [10.4, 22.3, 4.8]],
    )
}

fn calculated(config: WriterConfig) -> WriterConfig {
    config.with_normal_mode(NormalMode::CalculateNormals)
}

/// `%g` keeps six significant digits.
fn assert_six_digits(original: f64, decoded: f64) {
    assert!(
        (original - decoded).abs() <= 5e-6 * original.abs() + 1e-12,
        "{original} vs {decoded}"
    );
}

#[test]
fn skewed_triangle_reads_back_with_default_validation() {
    let binary = decode(&encode(&[skewed()], calculated(WriterConfig::default())));
    assert_eq!(binary.len(), 1);
    for (v, back) in skewed().vertices.iter().flatten().zip(binary[0].vertices.iter().flatten()) {
        assert_eq!(*back, f64::from(*v as f32));
    }

    let ascii = decode(&encode(
        &[skewed()],
        calculated(WriterConfig::Ascii(AsciiWriterOptions::new())),
    ));
    assert_eq!(ascii.len(), 1);
    for (v, back) in skewed().vertices.iter().flatten().zip(ascii[0].vertices.iter().flatten()) {
        assert_six_digits(*v, *back);
    }

    // Re-encoding the decoded text under the default check mode is lossless.
    let again = decode(&encode(&ascii, WriterConfig::Ascii(AsciiWriterOptions::new())));
    assert_eq!(again, ascii);
}

fn well_shaped() -> impl Strategy<Value = Triangle> {
    (
        prop::array::uniform3(-500.0f64..500.0),
        prop::array::uniform3(-50.0f64..50.0),
        prop::array::uniform3(-50.0f64..50.0),
    )
        .prop_filter("short edge or sliver", |(_, e1, e2)| {
            let (l1, l2) = (length(*e1), length(*e2));
            l1 >= 0.5 && l2 >= 0.5 && length(cross(*e1, *e2)) >= 0.1 * l1 * l2
        })
        .prop_map(|(v0, e1, e2)| {
            let v1 = [v0[0] + e1[0], v0[1] + e1[1], v0[2] + e1[2]];
            let v2 = [v0[0] + e2[0], v0[1] + e2[1], v0[2] + e2[2]];
            Triangle::new([0.0; 3], [v0, v1, v2])
        })
}

proptest! {
    #[test]
    fn binary_roundtrip_of_general_triangles(tri in well_shaped()) {
        let decoded = decode(&encode(&[tri.clone()], calculated(WriterConfig::default())));
        prop_assert_eq!(decoded.len(), 1);
        let normal = computed_normal(&tri).unwrap_or_default();
        for (n, back) in normal.iter().zip(&decoded[0].normal) {
            prop_assert_eq!(*back, f64::from(*n as f32));
        }
        for (v, back) in tri.vertices.iter().flatten().zip(decoded[0].vertices.iter().flatten()) {
            prop_assert_eq!(*back, f64::from(*v as f32));
        }
    }

    #[test]
    fn ascii_roundtrip_of_general_triangles(tri in well_shaped()) {
        let config = calculated(WriterConfig::Ascii(
            AsciiWriterOptions::new().with_line_ending(LineEnding::Lf),
        ));
        let decoded = decode(&encode(&[tri.clone()], config));
        prop_assert_eq!(decoded.len(), 1);
        let normal = computed_normal(&tri).unwrap_or_default();
        let expected = normal.iter().chain(tri.vertices.iter().flatten());
        let actual = decoded[0].normal.iter().chain(decoded[0].vertices.iter().flatten());
        for (x, y) in expected.zip(actual) {
            prop_assert!((x - y).abs() <= 5e-6 * x.abs() + 1e-12, "{} vs {}", x, y);
        }
    }
}
