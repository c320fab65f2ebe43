use sysout_triage::transcript::{BEGIN_MARKER, END_MARKER, extract_inner_log};

#[test]
fn extracts_between_markers_and_unescapes() {
    let transcript = format!("pre\n{BEGIN_MARKER}\nLINE1\\nLINE2\n{END_MARKER}\npost");
    let inner = extract_inner_log(&transcript).expect("inner log present");
    assert_eq!(inner, "LINE1\nLINE2");
}

#[test]
fn missing_begin_marker_is_not_present() {
    let transcript = format!("some output\n{END_MARKER}\nmore");
    assert!(extract_inner_log(&transcript).is_none());
}

#[test]
fn missing_end_marker_is_not_present() {
    let transcript = format!("some output\n{BEGIN_MARKER}\nJOB LOG");
    assert!(extract_inner_log(&transcript).is_none());
}

#[test]
fn reversed_markers_are_not_present() {
    let transcript = format!("{END_MARKER}\nJOB LOG\n{BEGIN_MARKER}");
    assert!(extract_inner_log(&transcript).is_none());
}

#[test]
fn only_first_pair_is_honored() {
    let transcript = format!(
        "{BEGIN_MARKER}first{END_MARKER}\nbetween\n{BEGIN_MARKER}second{END_MARKER}"
    );
    assert_eq!(extract_inner_log(&transcript).unwrap(), "first");
}

#[test]
fn unescaping_is_idempotent() {
    let transcript = format!("{BEGIN_MARKER}A\\nB{END_MARKER}");
    let inner = extract_inner_log(&transcript).unwrap();
    assert_eq!(inner, "A\nB");
    // No residual escape tokens; a second pass changes nothing.
    assert_eq!(inner.replace("\\n", "\n"), inner);
}

#[test]
fn surrounding_whitespace_is_trimmed() {
    let transcript = format!("{BEGIN_MARKER}   \n  JES2 LOG  \n   {END_MARKER}");
    assert_eq!(extract_inner_log(&transcript).unwrap(), "JES2 LOG");
}
