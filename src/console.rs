use crate::content::Level;

const COMPILING_AT_MS: u64 = 500;
const LINKING_AT_MS: u64 = 1000;
const RUNNING_AT_MS: u64 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    AwaitingInput(usize),
    Done,
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Log(&'static str),
    // logs "> Running..." then branches into prompt collection or Done
    Run,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due_ms: u64,
    task: Task,
}

/// Simulated build/run console shown after a ghost is matched. Log lines are
/// emitted on a scripted schedule driven by ticks; the pending tasks are
/// owned by this session, so dropping it (retry or level change) cancels
/// everything still scheduled.
#[derive(Debug)]
pub struct Console {
    level: Level,
    pub phase: Phase,
    pub log: Vec<String>,
    pub collected: Vec<String>,
    pub final_output: Option<String>,
    /// Transient edit buffer for the current prompt answer.
    pub answer: String,
    elapsed_ms: u64,
    pending: Vec<Scheduled>,
}

impl Console {
    pub fn new(level: Level) -> Self {
        let pending = vec![
            Scheduled {
                due_ms: COMPILING_AT_MS,
                task: Task::Log("> Compiling..."),
            },
            Scheduled {
                due_ms: LINKING_AT_MS,
                task: Task::Log("> Linking..."),
            },
            Scheduled {
                due_ms: RUNNING_AT_MS,
                task: Task::Run,
            },
        ];
        Self {
            level,
            phase: Phase::Init,
            log: Vec::new(),
            collected: Vec::new(),
            final_output: None,
            answer: String::new(),
            elapsed_ms: 0,
            pending,
        }
    }

    /// Advances the session clock and fires every task that has come due, in
    /// schedule order. A large `dt_ms` fires multiple tasks at once.
    pub fn on_tick(&mut self, dt_ms: u64) {
        self.elapsed_ms += dt_ms;
        while let Some(first) = self.pending.first() {
            if first.due_ms > self.elapsed_ms {
                break;
            }
            let scheduled = self.pending.remove(0);
            match scheduled.task {
                Task::Log(line) => self.log.push(line.to_string()),
                Task::Run => {
                    self.log.push("> Running...".to_string());
                    if self.level.input.is_some() {
                        self.phase = Phase::AwaitingInput(0);
                    } else {
                        self.final_output = Some(self.level.output.clone());
                        self.phase = Phase::Done;
                    }
                }
            }
        }
    }

    /// The prompt currently awaiting an answer, if any.
    pub fn current_prompt(&self) -> Option<&str> {
        let Phase::AwaitingInput(i) = self.phase else {
            return None;
        };
        self.level
            .input
            .as_ref()
            .and_then(|spec| spec.prompts.get(i))
            .map(String::as_str)
    }

    /// Submits the answer for the current prompt. A silent no-op outside of
    /// `AwaitingInput`; the UI only exposes the action when valid.
    pub fn submit_answer(&mut self, text: &str) {
        let Phase::AwaitingInput(i) = self.phase else {
            return;
        };
        let Some(spec) = self.level.input.clone() else {
            return;
        };

        let prompt = spec.prompts.get(i).map(String::as_str).unwrap_or_default();
        self.log.push(format!("{}{}", prompt, text));
        self.collected.push(text.to_string());
        self.answer.clear();

        if i + 1 < spec.prompts.len() {
            self.phase = Phase::AwaitingInput(i + 1);
        } else {
            self.final_output = Some(spec.handler.apply(&self.collected));
            self.phase = Phase::Done;
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn explanation(&self) -> Option<&str> {
        self.level.explanation.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{InputHandler, InputSpec};
    use assert_matches::assert_matches;

    fn plain_level() -> Level {
        Level {
            ghost: "print(1)".to_string(),
            output: "1".to_string(),
            explanation: Some("prints one".to_string()),
            input: None,
        }
    }

    fn input_level(prompts: &[&str], handler: InputHandler) -> Level {
        Level {
            ghost: "a + b".to_string(),
            output: "Sum printed".to_string(),
            explanation: None,
            input: Some(InputSpec {
                prompts: prompts.iter().map(|p| p.to_string()).collect(),
                handler,
            }),
        }
    }

    #[test]
    fn test_new_console_starts_in_init() {
        let console = Console::new(plain_level());
        assert_eq!(console.phase, Phase::Init);
        assert!(console.log.is_empty());
        assert!(console.final_output.is_none());
    }

    #[test]
    fn test_log_lines_fire_in_time_order() {
        let mut console = Console::new(plain_level());

        console.on_tick(499);
        assert!(console.log.is_empty());

        console.on_tick(1);
        assert_eq!(console.log, vec!["> Compiling..."]);

        console.on_tick(500);
        assert_eq!(console.log, vec!["> Compiling...", "> Linking..."]);

        console.on_tick(500);
        assert_eq!(
            console.log,
            vec!["> Compiling...", "> Linking...", "> Running..."]
        );
    }

    #[test]
    fn test_large_tick_fires_all_tasks_in_order() {
        let mut console = Console::new(plain_level());
        console.on_tick(10_000);

        assert_eq!(
            console.log,
            vec!["> Compiling...", "> Linking...", "> Running..."]
        );
        assert_eq!(console.phase, Phase::Done);
    }

    #[test]
    fn test_plain_level_branches_straight_to_done() {
        let mut console = Console::new(plain_level());
        console.on_tick(1500);

        assert_eq!(console.phase, Phase::Done);
        assert_eq!(console.final_output.as_deref(), Some("1"));
    }

    #[test]
    fn test_input_level_branches_to_first_prompt() {
        let mut console = Console::new(input_level(&["Enter a: ", "Enter b: "], InputHandler::Sum));
        console.on_tick(1500);

        assert_eq!(console.phase, Phase::AwaitingInput(0));
        assert_eq!(console.current_prompt(), Some("Enter a: "));
        assert!(console.final_output.is_none());
    }

    #[test]
    fn test_prompt_collection_flow() {
        // Scenario C: two prompts, sum handler, answers "2" then "3"
        let mut console = Console::new(input_level(&["Enter a: ", "Enter b: "], InputHandler::Sum));
        console.on_tick(1500);

        console.submit_answer("2");
        assert_eq!(console.phase, Phase::AwaitingInput(1));
        assert_eq!(console.current_prompt(), Some("Enter b: "));

        console.submit_answer("3");
        assert_eq!(console.phase, Phase::Done);
        assert_eq!(console.final_output.as_deref(), Some("5"));

        assert_eq!(
            console.log,
            vec![
                "> Compiling...",
                "> Linking...",
                "> Running...",
                "Enter a: 2",
                "Enter b: 3",
            ]
        );
    }

    #[test]
    fn test_exactly_n_submits_reach_done() {
        let mut console =
            Console::new(input_level(&["a: ", "b: ", "c: "], InputHandler::Concat));
        console.on_tick(1500);

        console.submit_answer("x");
        console.submit_answer("y");
        assert_matches!(console.phase, Phase::AwaitingInput(2));

        console.submit_answer("z");
        assert_eq!(console.phase, Phase::Done);
        assert_eq!(console.final_output.as_deref(), Some("xyz"));
        assert_eq!(console.collected, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_submit_answer_outside_awaiting_input_is_noop() {
        let mut console = Console::new(plain_level());

        // Init phase
        console.submit_answer("too early");
        assert!(console.log.is_empty());
        assert!(console.collected.is_empty());

        // Done phase
        console.on_tick(1500);
        let log_len = console.log.len();
        console.submit_answer("too late");
        assert_eq!(console.log.len(), log_len);
        assert!(console.collected.is_empty());
    }

    #[test]
    fn test_submit_clears_answer_buffer() {
        let mut console = Console::new(input_level(&["a: ", "b: "], InputHandler::Sum));
        console.on_tick(1500);

        console.answer.push_str("2");
        let text = console.answer.clone();
        console.submit_answer(&text);
        assert!(console.answer.is_empty());
    }

    #[test]
    fn test_drop_cancels_pending_tasks() {
        // Teardown before the schedule fires: nothing from the discarded
        // session can reach a replacement session.
        let mut console = Console::new(plain_level());
        console.on_tick(600);
        assert_eq!(console.log.len(), 1);

        console = Console::new(plain_level());
        console.on_tick(400);
        assert!(console.log.is_empty());
        assert_eq!(console.phase, Phase::Init);
    }

    #[test]
    fn test_no_prompt_outside_awaiting_input() {
        let mut console = Console::new(plain_level());
        assert_eq!(console.current_prompt(), None);
        console.on_tick(1500);
        assert_eq!(console.current_prompt(), None);
    }
}
