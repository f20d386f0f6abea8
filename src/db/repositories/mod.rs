mod measurements;
