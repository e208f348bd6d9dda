use clap::Parser;

fn main() -> anyhow::Result<()> {
    papers_tas_lib::run(papers_tas_lib::Args::parse())
}
