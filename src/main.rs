use argh::FromArgs;
use pipe_shell::Interpreter;
use std::io::Write;
use std::process::exit;

#[derive(FromArgs)]
/// Interactive command interpreter with builtins, pipelines and output redirection.
struct Args {
    /// run a single line and exit with its status
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// prompt shown before each line
    #[argh(option, default = "String::from(\"$ \")")]
    prompt: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let args: Args = argh::from_env();
    let mut sh = Interpreter::default();

    let code = match args.command {
        Some(line) => {
            let code = sh.run_line(&line);
            sh.exit_status().unwrap_or(code)
        }
        None => match sh.repl(&args.prompt) {
            Ok(code) => code,
            Err(e) => {
                log::debug!("input loop stopped: {:?}", e);
                eprintln!("Error reading input: {}", e);
                1
            }
        },
    };

    let _ = std::io::stdout().flush();
    exit(code);
}
