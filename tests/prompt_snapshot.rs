use urzasight::explain::{render_offline_template, render_tutor_prompt};

#[test]
fn tutor_prompt_snapshot() {
    let prompt = render_tutor_prompt("お前はもう死んでいる", "final panel, calm voice").unwrap();
    insta::assert_snapshot!("tutor_prompt", prompt);
}

#[test]
fn offline_template_snapshot() {
    let template = render_offline_template("やめてくれ").unwrap();
    insta::assert_snapshot!("offline_template", template);
}
