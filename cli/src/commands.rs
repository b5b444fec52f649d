/// One line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text, sent to the model
    Prompt(String),
    Models { refresh: bool },
    SelectModel(String),
    Sessions,
    /// `None` opens a picker
    Load(Option<String>),
    /// `None` asks for a name
    Save(Option<String>),
    /// Empty opens a multi-select picker. A typed name is one id, spaces included.
    Delete(Vec<String>),
    Clear,
    History,
    Help,
    Exit,
    Unknown(String),
}

impl Command {
    /// Parse a line. Blank input yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            return Some(Command::Exit);
        }
        let Some(body) = input.strip_prefix('/') else {
            return Some(Command::Prompt(input.to_string()));
        };

        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };
        let rest_opt = (!rest.is_empty()).then(|| rest.to_string());

        let command = match name.to_lowercase().as_str() {
            "models" => Command::Models {
                refresh: rest.eq_ignore_ascii_case("refresh"),
            },
            "model" => match rest_opt {
                Some(model) => Command::SelectModel(model),
                None => Command::Models { refresh: false },
            },
            "sessions" => Command::Sessions,
            "load" => Command::Load(rest_opt),
            "save" => Command::Save(rest_opt),
            "delete" => Command::Delete(rest_opt.into_iter().collect()),
            "clear" => Command::Clear,
            "history" => Command::History,
            "help" | "?" => Command::Help,
            "exit" | "quit" => Command::Exit,
            _ => Command::Unknown(input.to_string()),
        };
        Some(command)
    }
}
