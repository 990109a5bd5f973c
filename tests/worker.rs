use std::{fs, process::Command};

use marc_stream::{
    fields, worker::WorkerProcess, Error, MarcXml, PipelineConfig, Record, RecordBuilder,
};
use pretty_assertions::assert_eq;

fn records(n: usize) -> Vec<Record> {
    (1..=n)
        .map(|i| {
            let id = format!("rec{:04}", i);
            let mut builder = RecordBuilder::new();
            builder
                .set_leader("00714cam a2200205 a 4500")
                .set_identifier(id.as_str())
                .add_fields(fields!(
                    control fields: [b"001" => id.as_str()];
                    data fields: [
                        b"100", b"1 ", [b'a' => "Doe, Jane"],
                        b"245", b"10", [
                            b'a' => "Title",
                            b'b' => "& subtitle",
                        ],
                    ];
                ));
            builder.build()
        })
        .collect()
}

fn worker(config: &PipelineConfig) -> WorkerProcess {
    let command = Command::new(env!("CARGO_BIN_EXE_marc-worker"));
    WorkerProcess::spawn(command, config.clone()).unwrap()
}

#[test]
fn should_parse_files_in_worker_process() {
    let dir = tempfile::tempdir().unwrap();
    let expected = records(300);
    let path = dir.path().join("dump.xml");
    fs::write(&path, expected.xml_pretty().unwrap()).unwrap();

    let config = PipelineConfig {
        high_water: 16,
        low_water: 4,
        batch_size: 5,
        ..PipelineConfig::default()
    };
    let mut worker = worker(&config);

    let completion = worker.parse(path.to_str().unwrap(), Vec::new()).unwrap();
    assert_eq!(completion.records, 300);
    assert_eq!(completion.sink, expected);

    // the worker serves jobs one after another
    let truncated = dir.path().join("truncated.xml");
    let xml = expected[..2].to_vec().xml_minified().unwrap();
    fs::write(&truncated, &xml[..xml.len() - 40]).unwrap();
    match worker.parse(truncated.to_str().unwrap(), Vec::new()) {
        Err(Error::Parse(err)) => {
            assert!(err.is_truncation());
            assert_eq!(err.record, 2);
        }
        other => panic!("unexpected outcome: {:?}", other.map(|c| c.records)),
    }

    let again = worker.parse(path.to_str().unwrap(), Vec::new()).unwrap();
    assert_eq!(again.sink, expected);

    assert!(worker.finish().unwrap().success());
}
