#![no_main]

use libfuzzer_sys::fuzz_target;

use later::resolver::{classify, scan};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    // Neither the title scan nor the classifier may panic on arbitrary input
    let result = scan(&text);
    assert_eq!(result.title, result.title.trim());

    let _ = classify(Some(&text));
});
