use geoharvest::commands::command_argument_builder;
use geoharvest::handlers::handle_harvest;
use geoharvest_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    // Missing --output or sites prints usage and exits non-zero here
    let matches = cmd.get_matches();

    // Show banner unless --quiet flag is set
    if !matches.get_flag("quiet") {
        print_banner();
    }

    handle_harvest(&matches).await;
}
