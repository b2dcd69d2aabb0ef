//! Snapshot tests
//!
//! Resolves each fixtures/*.txt file line by line and compares the output.
//! Changed lines are marked with `~`, unchanged lines with `=`.

#[test]
fn snapshots() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("PROPSUB_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let properties = propsub::properties! {
        "name" => "world",
        "greeting" => "hello ${name}",
        "env" => "prod",
        "db.prod.host" => "db.example.com",
        "db.prod.port" => "5432",
        "version" => "1.2.3",
        "a" => "${b}",
        "b" => "${a}",
    };
    let resolver = propsub::resolver::Resolver::new(&properties);

    insta::glob!("fixtures/*.txt", |path| {
        let input = std::fs::read_to_string(path).unwrap();

        let rendered = input
            .lines()
            .map(|line| {
                let resolution = resolver.resolve(line);
                let marker = if resolution.changed { '~' } else { '=' };
                format!("{marker} {}", resolution.resolved)
            })
            .collect::<Vec<_>>()
            .join("\n");

        insta::assert_snapshot!(rendered);
    });
}
