use super::args::*;

pub(crate) mod convert;
pub(crate) mod plot;
pub(crate) mod run;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args).await,
        Command::Convert(args) => convert::run(args),
        Command::Plot(args) => plot::run(args),
    }
}
