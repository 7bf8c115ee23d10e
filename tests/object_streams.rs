use qdffix::{repair, Error};

fn fix(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    repair("in.pdf", input, &mut out).expect("repair failed");
    out
}

#[test]
fn object_stream_and_xref_stream_rewrite() {
    let input = b"%PDF-1.5\n\
1 0 obj\n\
<<\n\
  /Type /ObjStm\n\
  /Length 99\n\
  /N 0\n\
  /First 0\n\
>>\n\
stream\n\
1 0\n\
%% Object stream: object 2\n\
<<\n\
  /A 1\n\
>>\n\
%% Object stream: object 3\n\
<<\n\
  /B 2\n\
>>\n\
endstream\n\
endobj\n\
4 0 obj\n\
<<\n\
  /Type /Catalog\n\
>>\n\
endobj\n\
5 0 obj\n\
<<\n\
  /Type /XRef\n\
  /Length 99\n\
  /W [ 1 1 1 ]\n\
  /Size 99\n\
  /Root 4 0 R\n\
>>\n\
stream\n\
xxx\n\
endstream\n\
endobj\n";

    let mut expected = Vec::new();
    expected.extend_from_slice(
        b"%PDF-1.5\n\
1 0 obj\n\
<<\n\
  /Type /ObjStm\n\
  /Length 89\n\
  /N 2\n\
  /First 36\n\
>>\n\
stream\n\
2 0\n\
3 40\n\
%% Object stream: object 2\n\
<<\n\
  /A 1\n\
>>\n\
%% Object stream: object 3\n\
<<\n\
  /B 2\n\
>>\n\
endstream\n\
endobj\n\
4 0 obj\n\
<<\n\
  /Type /Catalog\n\
>>\n\
endobj\n\
5 0 obj\n\
<<\n\
  /Type /XRef\n\
  /Length 18\n\
  /W [ 1 1 1 ]\n\
  /Size 6\n\
  /Root 4 0 R\n\
>>\n\
stream\n",
    );
    // Null entry, one uncompressed, two compressed, two uncompressed.
    expected.extend_from_slice(&[
        0, 0, 0, //
        1, 9, 0, //
        2, 1, 0, //
        2, 1, 1, //
        1, 184, 0, //
        1, 222, 0,
    ]);
    expected.extend_from_slice(b"\nendstream\nendobj\n\nstartxref\n222\n%%EOF\n");

    let output = fix(input);
    assert_eq!(output, expected);

    // The uncompressed entries land on the object headers they describe.
    assert!(output[9..].starts_with(b"1 0 obj\n"));
    assert!(output[184..].starts_with(b"4 0 obj\n"));
    assert!(output[222..].starts_with(b"5 0 obj\n"));
}

#[test]
fn object_stream_output_is_idempotent() {
    let input = b"%PDF-1.5\n\
1 0 obj\n\
<<\n\
  /Type /ObjStm\n\
  /Length 99\n\
  /N 0\n\
  /First 0\n\
>>\n\
stream\n\
1 0\n\
%% Object stream: object 2\n\
<<\n\
  /A 1\n\
>>\n\
%% Object stream: object 3\n\
<<\n\
  /B 2\n\
>>\n\
endstream\n\
endobj\n\
4 0 obj\n\
<<\n\
  /Type /Catalog\n\
>>\n\
endobj\n\
5 0 obj\n\
<<\n\
  /Type /XRef\n\
  /Length 99\n\
  /W [ 1 1 1 ]\n\
  /Size 99\n\
  /Root 4 0 R\n\
>>\n\
stream\n";
    let once = fix(input);
    let twice = fix(&once);
    assert_eq!(once, twice);
}

#[test]
fn xref_stream_without_object_streams() {
    // No compressed entries; the index field still gets one byte, and
    // everything after the binary body is discarded.
    let input = b"1 0 obj\n\
<<\n\
  /Type /Catalog\n\
>>\n\
endobj\n\
2 0 obj\n\
<<\n\
  /Type /XRef\n\
  /Length 0\n\
  /W [ 1 1 1 ]\n\
  /Size 0\n\
  /Root 1 0 R\n\
>>\n\
stream\n\
junk\n\
endstream\n\
endobj\n";

    let mut expected = Vec::new();
    expected.extend_from_slice(
        b"1 0 obj\n\
<<\n\
  /Type /Catalog\n\
>>\n\
endobj\n\
2 0 obj\n\
<<\n\
  /Type /XRef\n\
  /Length 9\n\
  /W [ 1 1 1 ]\n\
  /Size 3\n\
  /Root 1 0 R\n\
>>\n\
stream\n",
    );
    expected.extend_from_slice(&[
        0, 0, 0, //
        1, 0, 0, //
        1, 38, 0,
    ]);
    expected.extend_from_slice(b"\nendstream\nendobj\n\nstartxref\n38\n%%EOF\n");

    assert_eq!(fix(input), expected);
}

#[test]
fn out_of_order_contained_object_is_fatal() {
    let input = b"1 0 obj\n\
<<\n\
  /Type /ObjStm\n\
>>\n\
stream\n\
%% Object stream: object 5\n";
    let mut out = Vec::new();
    let err = repair("in.pdf", input, &mut out).unwrap_err();
    assert!(matches!(err, Error::ObjectOutOfOrder { .. }));
    assert_eq!(err.to_string(), "in.pdf:6: expected object 2");
}
